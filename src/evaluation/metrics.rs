//! Classification metrics

use crate::error::{Result, TrainError};
use crate::training::unique_labels;
use ndarray::Array1;

/// Label treated as positive by [`precision_score`]
pub const POSITIVE_LABEL: f64 = 1.0;

fn check_pair(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(TrainError::Shape {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TrainError::Evaluation(
            "cannot score an empty label vector".to_string(),
        ));
    }
    Ok(())
}

/// Per-label confusion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LabelCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl LabelCounts {
    fn for_label(label: f64, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == label, p == label) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }

    fn support(&self) -> usize {
        self.tp + self.fn_
    }

    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Zero division yields 0.0
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Fraction of exact label matches
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Binary precision for label `1`.
///
/// Fails when the labels present are not a binary set containing `1`.
pub fn precision_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let labels = unique_labels(y_true.iter().chain(y_pred.iter()));
    if labels.len() > 2 {
        return Err(TrainError::Evaluation(format!(
            "binary precision needs at most 2 labels, got {:?}",
            labels
        )));
    }
    if labels.len() == 2 && !labels.contains(&POSITIVE_LABEL) {
        return Err(TrainError::Evaluation(format!(
            "positive label {} not among labels {:?}",
            POSITIVE_LABEL, labels
        )));
    }
    Ok(LabelCounts::for_label(POSITIVE_LABEL, y_true, y_pred).precision())
}

/// Support-weighted mean of per-label F1 over the union of labels
pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let labels = unique_labels(y_true.iter().chain(y_pred.iter()));

    let mut weighted = 0.0;
    let mut total_support = 0usize;
    for label in labels {
        let counts = LabelCounts::for_label(label, y_true, y_pred);
        weighted += counts.f1() * counts.support() as f64;
        total_support += counts.support();
    }
    Ok(ratio_f(weighted, total_support))
}

fn ratio_f(num: f64, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num / den as f64
    }
}
