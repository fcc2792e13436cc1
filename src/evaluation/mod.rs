//! Model evaluation against a held-out pair

mod metrics;

pub use metrics::{accuracy_score, f1_score, precision_score, POSITIVE_LABEL};

use crate::error::Result;
use crate::training::Predictor;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Scores of one model on one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub model_name: String,
    pub accuracy: f64,
    /// Support-weighted F1
    pub f1_score: f64,
    /// Binary precision for label `1`
    pub precision: f64,
}

impl EvaluationResult {
    /// Drop the model name, keeping only the numeric metrics
    pub fn into_metrics(self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("accuracy".to_string(), self.accuracy),
            ("f1_score".to_string(), self.f1_score),
            ("precision".to_string(), self.precision),
        ])
    }
}

/// Score a fitted model.
///
/// `model_name` is recorded as given; the model itself is only asked for
/// predictions.
pub fn evaluate_model<M: Predictor + ?Sized>(
    model: &M,
    model_name: &str,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<EvaluationResult> {
    let accuracy = model.score(x, y)?;
    let y_pred = model.predict(x)?;
    let f1 = f1_score(y, &y_pred)?;
    let precision = precision_score(y, &y_pred)?;

    info!(model = model_name, rows = y.len(), accuracy, f1_score = f1, precision, "Evaluated model");

    Ok(EvaluationResult {
        model_name: model_name.to_string(),
        accuracy,
        f1_score: f1,
        precision,
    })
}
