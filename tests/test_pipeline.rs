//! Integration test: pipeline fitting, evaluation and persistence

use ndarray::Array1;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tabular_train::data::{split_data, SplitData, SplitOptions};
use tabular_train::evaluation::evaluate_model;
use tabular_train::export::{load_pipeline, save_pipeline, ModelMetadata};
use tabular_train::preprocessing::Scaler;
use tabular_train::training::{
    build_model, build_pipeline, Classifier, DecisionTreeClassifier, LogisticRegression, Predictor,
};
use tabular_train::TrainError;

fn create_classification_dataset(n: usize) -> DataFrame {
    let mut f1 = Vec::with_capacity(n);
    let mut f2 = Vec::with_capacity(n);
    let mut label = Vec::with_capacity(n);

    for i in 0..n {
        let x = i as f64;
        f1.push(x * 10.0);
        f2.push((x * 0.3).sin() * 100.0);
        label.push(if i >= n / 2 { 1i64 } else { 0 });
    }

    df!(
        "f1" => &f1,
        "f2" => &f2,
        "y" => &label,
        "label" => &label
    )
    .unwrap()
}

fn split(df: &DataFrame, dir: &Path) -> SplitData {
    fs::create_dir_all(dir.join("processed")).unwrap();
    let opts = SplitOptions {
        output_dir: dir.join("processed"),
        features_path: dir.join("features.csv"),
        target_path: dir.join("target.csv"),
        ..Default::default()
    };
    split_data(df, &opts).unwrap()
}

#[test]
fn test_pipeline_on_split_data() {
    let dir = tempfile::tempdir().unwrap();
    let data = split(&create_classification_dataset(60), dir.path());

    let pipe = build_pipeline(LogisticRegression::new(), &data.x_train, &data.y_train, Scaler::standard())
        .unwrap();
    let result = evaluate_model(&pipe, pipe.classifier_name(), &data.x_test, &data.y_test).unwrap();

    assert_eq!(result.model_name, "LogisticRegression");
    assert!(result.accuracy > 0.8, "accuracy = {}", result.accuracy);
    assert!(result.f1_score > 0.8, "f1 = {}", result.f1_score);
}

#[test]
fn test_scaler_ignores_test_rows() {
    let dir = tempfile::tempdir().unwrap();
    let df = create_classification_dataset(40);
    let data = split(&df, dir.path());

    // Same split, but every test row's features replaced by huge values
    let test_rows: std::collections::HashSet<usize> = data.test_index.iter().copied().collect();
    let f1: Vec<f64> = (0..40)
        .map(|i| if test_rows.contains(&i) { 1e9 } else { i as f64 * 10.0 })
        .collect();
    let mut perturbed = df.clone();
    perturbed.replace("f1", Series::new("f1".into(), f1)).unwrap();

    let other_dir = tempfile::tempdir().unwrap();
    let perturbed_data = split(&perturbed, other_dir.path());
    assert_eq!(perturbed_data.train_index, data.train_index);

    let a = build_pipeline(LogisticRegression::new(), &data.x_train, &data.y_train, Scaler::standard())
        .unwrap();
    let b = build_pipeline(
        LogisticRegression::new(),
        &perturbed_data.x_train,
        &perturbed_data.y_train,
        Scaler::standard(),
    )
    .unwrap();

    assert_eq!(a.scaler().center(), b.scaler().center());
    assert_eq!(a.scaler().scale(), b.scaler().scale());
}

#[test]
fn test_saved_pipeline_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let data = split(&create_classification_dataset(60), dir.path());

    for pipe in [
        build_pipeline(LogisticRegression::new(), &data.x_train, &data.y_train, Scaler::standard()),
        build_pipeline(DecisionTreeClassifier::new(), &data.x_train, &data.y_train, Scaler::min_max()),
    ] {
        let pipe = pipe.unwrap();
        let path = dir.path().join("models").join("pipe.pkl");
        let metadata = ModelMetadata::for_pipeline("pipe", &pipe).with_features(data.feature_names.clone());
        save_pipeline(&pipe, &path, metadata).unwrap();

        let (restored, metadata) = load_pipeline(&path).unwrap();
        assert_eq!(metadata.model_type, pipe.classifier_name());
        assert_eq!(metadata.feature_names, data.feature_names);
        assert_eq!(
            Predictor::predict(&restored, &data.x_test).unwrap(),
            Predictor::predict(&pipe, &data.x_test).unwrap()
        );
        assert_eq!(restored.get_params(), pipe.get_params());
    }
}

#[test]
fn test_corrupted_model_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let data = split(&create_classification_dataset(30), dir.path());
    let pipe = build_pipeline(LogisticRegression::new(), &data.x_train, &data.y_train, Scaler::standard())
        .unwrap();

    let path = dir.path().join("pipe.pkl");
    save_pipeline(&pipe, &path, ModelMetadata::for_pipeline("pipe", &pipe)).unwrap();

    // The last 8 bytes are the checksum; flip the final payload byte
    let mut bytes = fs::read(&path).unwrap();
    let idx = bytes.len() - 9;
    bytes[idx] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = load_pipeline(&path).unwrap_err();
    assert!(matches!(err, TrainError::Serialization(_)));
}

#[test]
fn test_unfitted_pipeline_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let pipe = tabular_train::training::Pipeline::new(Scaler::standard(), LogisticRegression::new());
    let err = save_pipeline(&pipe, dir.path().join("p.pkl"), ModelMetadata::new("p")).unwrap_err();
    assert!(matches!(err, TrainError::ModelNotFitted));
}

#[test]
fn test_build_model_without_scaler() {
    let dir = tempfile::tempdir().unwrap();
    let data = split(&create_classification_dataset(60), dir.path());

    let model = build_model(DecisionTreeClassifier::new(), &data.x_train, &data.y_train).unwrap();
    assert!(model.is_fitted());
    let pred: Array1<f64> = model.predict(&data.x_test).unwrap();
    assert_eq!(pred.len(), data.n_test());

    let result = evaluate_model(&model, model.class_name(), &data.x_test, &data.y_test).unwrap();
    assert!(result.accuracy > 0.8);
}
