//! Two-stage estimator pipeline: a fitted scaler followed by a classifier

use super::{check_lengths, Classifier, Estimator, Predictor};
use crate::error::{Result, TrainError};
use crate::preprocessing::Scaler;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Name of the scaling stage
pub const SCALER_STEP: &str = "scaler";
/// Name of the classifier stage
pub const CLASSIFIER_STEP: &str = "clf";

/// A scaler stage followed by a classifier stage.
///
/// Fitting learns the scaler's parameters from the training matrix, then fits
/// the classifier on the scaled rows. Prediction reuses the stored scaler
/// parameters, so nothing from later data leaks into the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    scaler: Scaler,
    classifier: Estimator,
}

impl Pipeline {
    pub fn new(scaler: Scaler, classifier: impl Into<Estimator>) -> Self {
        Self {
            scaler,
            classifier: classifier.into(),
        }
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &Estimator {
        &self.classifier
    }

    /// Class name of the final stage, e.g. `LogisticRegression`
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.class_name()
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_fitted() && self.classifier.is_fitted()
    }

    /// Fit both stages on the training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_lengths(x, y)?;
        let scaled = self.scaler.fit_transform(x)?;
        self.classifier.fit(&scaled, y)?;
        debug!(
            rows = x.nrows(),
            features = x.ncols(),
            classifier = self.classifier_name(),
            "Pipeline fitted"
        );
        Ok(self)
    }

    /// Scale `x` with the fitted scaler, then predict
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.scaler.is_fitted() {
            return Err(TrainError::ModelNotFitted);
        }
        let scaled = self.scaler.transform(x)?;
        self.classifier.predict(&scaled)
    }

    /// Estimator-style parameter listing.
    ///
    /// Top-level keys describe the pipeline (`steps`, `memory`, `verbose`,
    /// one key per stage); nested hyperparameters appear as
    /// `<stage>__<name>`.
    pub fn get_params(&self) -> BTreeMap<String, Value> {
        let scaler_repr = format!("{}()", self.scaler.class_name());
        let clf_repr = format!("{}()", self.classifier_name());

        let mut params = BTreeMap::new();
        params.insert("memory".to_string(), Value::Null);
        params.insert("verbose".to_string(), json!(false));
        params.insert(
            "steps".to_string(),
            json!([[SCALER_STEP, scaler_repr], [CLASSIFIER_STEP, clf_repr]]),
        );
        params.insert(SCALER_STEP.to_string(), json!(scaler_repr));
        params.insert(CLASSIFIER_STEP.to_string(), json!(clf_repr));

        for (name, value) in self.scaler.hyperparameters() {
            params.insert(format!("{}__{}", SCALER_STEP, name), value);
        }
        for (name, value) in self.classifier.hyperparameters() {
            params.insert(format!("{}__{}", CLASSIFIER_STEP, name), value);
        }
        params
    }
}

impl Predictor for Pipeline {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Pipeline::predict(self, x)
    }
}

/// Fit a scaler + classifier pipeline on the training split
pub fn build_pipeline(
    classifier: impl Into<Estimator>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    scaler: Scaler,
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(scaler, classifier);
    info!(
        scaler = pipeline.scaler().class_name(),
        classifier = pipeline.classifier_name(),
        rows = x_train.nrows(),
        "Building pipeline"
    );
    pipeline.fit(x_train, y_train)?;
    Ok(pipeline)
}

/// Fit a bare classifier (no scaling stage) on the training split
pub fn build_model(
    classifier: impl Into<Estimator>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
) -> Result<Estimator> {
    let mut model = classifier.into();
    info!(
        classifier = model.class_name(),
        rows = x_train.nrows(),
        "Building model"
    );
    model.fit(x_train, y_train)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{DecisionTreeClassifier, LogisticRegression};
    use ndarray::array;

    fn training_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [10.0, 200.0],
            [12.0, 210.0],
            [11.0, 190.0],
            [30.0, 400.0],
            [32.0, 420.0],
            [31.0, 390.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_build_pipeline_fits_both_stages() {
        let (x, y) = training_data();
        let pipe = build_pipeline(LogisticRegression::new(), &x, &y, Scaler::standard()).unwrap();

        assert!(pipe.is_fitted());
        assert_eq!(pipe.classifier_name(), "LogisticRegression");
        assert_eq!(pipe.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_scaler_learned_from_training_rows_only() {
        let (x, y) = training_data();
        let pipe = build_pipeline(LogisticRegression::new(), &x, &y, Scaler::standard()).unwrap();
        let center = pipe.scaler().center().unwrap().clone();
        let scale = pipe.scaler().scale().unwrap().clone();

        // Predicting on wildly different rows must not move the scaler
        let other = array![[1e6, -1e6], [-5.0, 0.0]];
        let _ = pipe.predict(&other).unwrap();
        assert_eq!(pipe.scaler().center().unwrap(), &center);
        assert_eq!(pipe.scaler().scale().unwrap(), &scale);

        assert!((center[0] - 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_get_params_layout() {
        let (x, y) = training_data();
        let pipe = build_pipeline(LogisticRegression::new(), &x, &y, Scaler::standard()).unwrap();
        let params = pipe.get_params();

        assert_eq!(params["memory"], Value::Null);
        assert_eq!(params["verbose"], json!(false));
        assert_eq!(params["scaler"], json!("StandardScaler()"));
        assert_eq!(params["clf"], json!("LogisticRegression()"));
        assert_eq!(
            params["steps"],
            json!([["scaler", "StandardScaler()"], ["clf", "LogisticRegression()"]])
        );
        assert_eq!(params["scaler__with_mean"], json!(true));
        assert_eq!(params["clf__C"], json!(1.0));
        assert_eq!(params["clf__max_iter"], json!(1000));
    }

    #[test]
    fn test_pipeline_with_tree_and_minmax() {
        let (x, y) = training_data();
        let pipe = build_pipeline(DecisionTreeClassifier::new(), &x, &y, Scaler::min_max()).unwrap();
        assert_eq!(pipe.classifier_name(), "DecisionTreeClassifier");
        assert_eq!(pipe.get_params()["scaler"], json!("MinMaxScaler()"));
        assert_eq!(pipe.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_build_model_without_scaling() {
        let (x, y) = training_data();
        let model = build_model(DecisionTreeClassifier::new(), &x, &y).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_predict_unfitted_pipeline() {
        let pipe = Pipeline::new(Scaler::standard(), LogisticRegression::new());
        assert!(matches!(pipe.predict(&array![[1.0, 2.0]]), Err(TrainError::ModelNotFitted)));
    }

    #[test]
    fn test_mismatched_lengths() {
        let (x, _) = training_data();
        let err = build_pipeline(LogisticRegression::new(), &x, &array![0.0, 1.0], Scaler::standard())
            .unwrap_err();
        assert!(matches!(err, TrainError::Shape { .. }));
    }
}
