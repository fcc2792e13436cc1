//! Integration test: full run (load → split → fit → evaluate → save → track)

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tabular_train::config::RunConfig;
use tabular_train::driver::{run, MODEL_CLASS_PARAM, PIPELINE_PARAM};
use tabular_train::export::load_pipeline;
use tabular_train::tracking::{ExperimentTracker, RunStatus};
use tabular_train::training::ModelType;
use tabular_train::TrainError;

/// 100 rows: `f1`, `f2`, `y` (values 0,1,2 cycling) and a 70/30 `label`
fn write_dataset(path: &Path) {
    let n = 100;
    let f1: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let f2: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64).collect();
    let y: Vec<i64> = (0..n).map(|i| (i % 3) as i64).collect();
    let label: Vec<i64> = (0..n).map(|i| if i < 70 { 0 } else { 1 }).collect();

    let mut df = df!(
        "f1" => &f1,
        "f2" => &f2,
        "y" => &y,
        "label" => &label
    )
    .unwrap();

    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(&mut df).unwrap();
}

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("processed")).unwrap();
        write_dataset(&root.join("data.csv"));
        Self { _dir: dir, root }
    }

    fn config(&self) -> RunConfig {
        RunConfig::new(self.root.join("data.csv"))
            .with_label_column("label")
            .with_output_dir(self.root.join("processed"))
            .with_features_path(self.root.join("features.csv"))
            .with_target_path(self.root.join("target.csv"))
            .with_model_path(self.root.join("models").join("pipe_lr.pkl"))
            .with_tracking_dir(self.root.join("mlruns"))
    }
}

fn data_rows(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count() - 1
}

#[test]
fn test_full_run_writes_outputs_and_tracks() {
    let ws = Workspace::new();
    let config = ws.config();

    let summary = run(&config).unwrap();

    // Split side effects
    let processed = ws.root.join("processed");
    assert_eq!(data_rows(&processed.join("x_train.csv")), 70);
    assert_eq!(data_rows(&processed.join("y_train.csv")), 70);
    assert_eq!(data_rows(&processed.join("x_test.csv")), 30);
    assert_eq!(data_rows(&processed.join("y_test.csv")), 30);

    let x_header = fs::read_to_string(processed.join("x_train.csv")).unwrap();
    assert_eq!(x_header.lines().next().unwrap(), ",f1,f2,y");

    let features = fs::read_to_string(ws.root.join("features.csv")).unwrap();
    assert_eq!(features.lines().collect::<Vec<_>>(), vec!["f1", "f2", "y"]);

    let target = fs::read_to_string(ws.root.join("target.csv")).unwrap();
    assert_eq!(
        target.lines().collect::<Vec<_>>(),
        vec!["target_labels", "0", "1", "2"]
    );

    // Summary
    assert_eq!(summary.n_train, 70);
    assert_eq!(summary.n_test, 30);
    assert_eq!(summary.feature_names, vec!["f1", "f2", "y"]);
    assert_eq!(summary.model_class, "LogisticRegression");
    let stages: Vec<&str> = summary.stage_secs.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(stages, vec!["load", "split", "fit", "track"]);
    assert!(summary.stage_secs.windows(2).all(|w| w[0].1 <= w[1].1));
    for key in ["train__accuracy", "train__f1_score", "train__precision"] {
        let value = summary.metrics[key];
        assert!((0.0..=1.0).contains(&value), "{} = {}", key, value);
    }

    // Tracking store
    let tracker = ExperimentTracker::with_dir(ws.root.join("mlruns"));
    let runs = tracker.list_runs("Default").unwrap();
    assert_eq!(runs.len(), 1);
    let stored = &runs[0];
    assert_eq!(stored.run_id, summary.run_id);
    assert_eq!(stored.status, RunStatus::Finished);
    assert_eq!(stored.params[MODEL_CLASS_PARAM], "LogisticRegression");
    assert_eq!(stored.metrics.len(), 3);
    for (key, value) in &summary.metrics {
        assert!((stored.metrics[key] - value).abs() < 1e-12, "{}", key);
    }

    let params: serde_json::Value = serde_json::from_str(&stored.params[PIPELINE_PARAM]).unwrap();
    assert_eq!(params["clf"], "LogisticRegression()");
    assert_eq!(params["scaler"], "StandardScaler()");
    assert!(params.get("clf__C").is_some());

    // Saved model
    let (pipeline, metadata) = load_pipeline(&config.model_path).unwrap();
    assert_eq!(pipeline.classifier_name(), "LogisticRegression");
    assert_eq!(metadata.feature_names, vec!["f1", "f2", "y"]);
    assert_eq!(metadata.target_name, "label");
    assert!(stored
        .artifacts
        .contains(&config.model_path.display().to_string()));
}

#[test]
fn test_repeated_runs_share_experiment() {
    let ws = Workspace::new();
    let config = ws.config().with_model(ModelType::DecisionTree);

    let first = run(&config).unwrap();
    let second = run(&config).unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.model_class, "DecisionTreeClassifier");

    let tracker = ExperimentTracker::with_dir(ws.root.join("mlruns"));
    assert_eq!(tracker.list_experiments().unwrap().len(), 1);
    assert_eq!(tracker.list_runs("Default").unwrap().len(), 2);
}

#[test]
fn test_missing_label_fails_before_tracking() {
    let ws = Workspace::new();
    let config = ws.config().with_label_column("missing");

    let err = run(&config).unwrap_err();
    assert!(matches!(err, TrainError::FeatureNotFound(ref c) if c == "missing"));

    let tracker = ExperimentTracker::with_dir(ws.root.join("mlruns"));
    assert!(tracker.list_runs("Default").unwrap().is_empty());
}

#[test]
fn test_failure_after_run_opened_is_recorded() {
    let ws = Workspace::new();
    // A directory cannot be overwritten by the model file
    let blocked = ws.root.join("blocked");
    fs::create_dir_all(&blocked).unwrap();
    let config = ws.config().with_model_path(&blocked);

    assert!(run(&config).is_err());

    let tracker = ExperimentTracker::with_dir(ws.root.join("mlruns"));
    let runs = tracker.list_runs("Default").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].params.is_empty());

    // Split outputs written before the failure stay on disk
    assert!(ws.root.join("processed").join("x_train.csv").exists());
}
