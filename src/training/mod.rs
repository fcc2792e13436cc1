//! Model training module
//!
//! Provides the classifiers and the two-stage pipeline:
//! - Logistic regression (L2-regularised, gradient descent)
//! - Decision tree classifier (Gini CART)
//! - [`Pipeline`]: a scaler stage followed by a classifier stage

pub mod decision_tree;
pub mod linear_models;
pub mod pipeline;

pub use decision_tree::{DecisionTreeClassifier, TreeNode};
pub use linear_models::LogisticRegression;
pub use pipeline::{build_model, build_pipeline, Pipeline, CLASSIFIER_STEP, SCALER_STEP};

use crate::error::{Result, TrainError};
use crate::evaluation::accuracy_score;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Anything that can label rows of a feature matrix
pub trait Predictor {
    /// Predict one label per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Mean accuracy on the given data
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        accuracy_score(y, &y_pred)
    }
}

/// A classifier that can be fit and described
pub trait Classifier: Predictor {
    /// Fit to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Estimator-style class name, e.g. `LogisticRegression`
    fn class_name(&self) -> &'static str;

    /// Hyperparameters, keyed by name
    fn hyperparameters(&self) -> BTreeMap<String, Value>;

    fn is_fitted(&self) -> bool;
}

/// Type of classifier to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Logistic Regression
    LogisticRegression,
    /// Decision Tree
    DecisionTree,
}

impl ModelType {
    /// Build an untrained estimator with default hyperparameters
    pub fn build(&self) -> Estimator {
        match self {
            ModelType::LogisticRegression => Estimator::LogisticRegression(LogisticRegression::new()),
            ModelType::DecisionTree => Estimator::DecisionTree(DecisionTreeClassifier::new()),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::LogisticRegression => write!(f, "logistic_regression"),
            ModelType::DecisionTree => write!(f, "decision_tree"),
        }
    }
}

impl FromStr for ModelType {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "logistic" | "logistic_regression" | "logisticregression" => {
                Ok(ModelType::LogisticRegression)
            }
            "decision_tree" | "tree" | "decisiontreeclassifier" => Ok(ModelType::DecisionTree),
            other => Err(TrainError::InvalidParameter {
                name: "model".to_string(),
                value: other.to_string(),
                reason: "expected 'logistic_regression' or 'decision_tree'".to_string(),
            }),
        }
    }
}

/// A concrete classifier; the serializable second stage of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTreeClassifier),
}

impl From<LogisticRegression> for Estimator {
    fn from(model: LogisticRegression) -> Self {
        Estimator::LogisticRegression(model)
    }
}

impl From<DecisionTreeClassifier> for Estimator {
    fn from(model: DecisionTreeClassifier) -> Self {
        Estimator::DecisionTree(model)
    }
}

impl Predictor for Estimator {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::LogisticRegression(m) => m.predict(x),
            Estimator::DecisionTree(m) => m.predict(x),
        }
    }
}

impl Classifier for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::LogisticRegression(m) => Classifier::fit(m, x, y),
            Estimator::DecisionTree(m) => Classifier::fit(m, x, y),
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression(m) => m.class_name(),
            Estimator::DecisionTree(m) => m.class_name(),
        }
    }

    fn hyperparameters(&self) -> BTreeMap<String, Value> {
        match self {
            Estimator::LogisticRegression(m) => m.hyperparameters(),
            Estimator::DecisionTree(m) => m.hyperparameters(),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            Estimator::LogisticRegression(m) => Classifier::is_fitted(m),
            Estimator::DecisionTree(m) => Classifier::is_fitted(m),
        }
    }
}

/// Sorted distinct labels
pub(crate) fn unique_labels<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = values.into_iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    classes
}

pub(crate) fn check_lengths(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(TrainError::Shape {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(TrainError::InvalidInput("cannot fit on zero rows".to_string()));
    }
    Ok(())
}
