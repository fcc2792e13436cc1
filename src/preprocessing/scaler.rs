//! Feature scaling implementations

use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling into `feature_range`
    MinMax,
}

impl ScalerType {
    /// Estimator-style class name of the scaler
    pub fn class_name(&self) -> &'static str {
        match self {
            ScalerType::Standard => "StandardScaler",
            ScalerType::MinMax => "MinMaxScaler",
        }
    }
}

impl fmt::Display for ScalerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerType::Standard => write!(f, "standard"),
            ScalerType::MinMax => write!(f, "minmax"),
        }
    }
}

impl FromStr for ScalerType {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "standard_scaler" => Ok(ScalerType::Standard),
            "minmax" | "min_max" | "minmax_scaler" => Ok(ScalerType::MinMax),
            other => Err(TrainError::InvalidParameter {
                name: "scaler".to_string(),
                value: other.to_string(),
                reason: "expected 'standard' or 'minmax'".to_string(),
            }),
        }
    }
}

/// Per-feature parameters learned by `fit`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: Array1<f64>, // mean or min
    scale: Array1<f64>,  // std or range
}

/// Feature scaler over dense matrices.
///
/// Parameters are learned from the matrix passed to `fit` only; `transform`
/// applies them unchanged to any later matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    /// Center on the mean (standard scaling)
    pub with_mean: bool,
    /// Divide by the standard deviation (standard scaling)
    pub with_std: bool,
    /// Output range (min-max scaling)
    pub feature_range: (f64, f64),
    params: Option<ScalerParams>,
}

impl Scaler {
    /// Create a new, unfitted scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            with_mean: true,
            with_std: true,
            feature_range: (0.0, 1.0),
            params: None,
        }
    }

    pub fn standard() -> Self {
        Self::new(ScalerType::Standard)
    }

    pub fn min_max() -> Self {
        Self::new(ScalerType::MinMax)
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn class_name(&self) -> &'static str {
        self.scaler_type.class_name()
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Fitted centers (mean or min), one per feature
    pub fn center(&self) -> Option<&Array1<f64>> {
        self.params.as_ref().map(|p| &p.center)
    }

    /// Fitted scales (std or range), one per feature
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.params.as_ref().map(|p| &p.scale)
    }

    /// Hyperparameters, keyed by name
    pub fn hyperparameters(&self) -> BTreeMap<String, Value> {
        let mut params = BTreeMap::new();
        params.insert("copy".to_string(), json!(true));
        match self.scaler_type {
            ScalerType::Standard => {
                params.insert("with_mean".to_string(), json!(self.with_mean));
                params.insert("with_std".to_string(), json!(self.with_std));
            }
            ScalerType::MinMax => {
                params.insert(
                    "feature_range".to_string(),
                    json!([self.feature_range.0, self.feature_range.1]),
                );
                params.insert("clip".to_string(), json!(false));
            }
        }
        params
    }

    /// Learn per-feature parameters from `x`
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(TrainError::InvalidInput(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        if self.scaler_type == ScalerType::MinMax && self.feature_range.0 >= self.feature_range.1 {
            return Err(TrainError::InvalidParameter {
                name: "feature_range".to_string(),
                value: format!("{:?}", self.feature_range),
                reason: "minimum must be smaller than maximum".to_string(),
            });
        }

        let params = match self.scaler_type {
            ScalerType::Standard => {
                let n_features = x.ncols();
                let center = if self.with_mean {
                    x.mean_axis(Axis(0))
                        .unwrap_or_else(|| Array1::zeros(n_features))
                } else {
                    Array1::zeros(n_features)
                };
                let scale = if self.with_std {
                    // population std, like most scaler implementations
                    x.std_axis(Axis(0), 0.0).mapv(non_zero)
                } else {
                    Array1::ones(n_features)
                };
                ScalerParams { center, scale }
            }
            ScalerType::MinMax => {
                let min = x.fold_axis(Axis(0), f64::INFINITY, |a, &b| a.min(b));
                let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |a, &b| a.max(b));
                let range = (&max - &min).mapv(non_zero);
                ScalerParams { center: min, scale: range }
            }
        };

        self.params = Some(params);
        Ok(self)
    }

    /// Apply the fitted parameters to `x`
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params.as_ref().ok_or(TrainError::ModelNotFitted)?;
        check_width(params, x)?;

        let scaled = (x - &params.center) / &params.scale;
        Ok(match self.scaler_type {
            ScalerType::Standard => scaled,
            ScalerType::MinMax => {
                let (low, high) = self.feature_range;
                scaled.mapv(|v| v * (high - low) + low)
            }
        })
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

fn non_zero(spread: f64) -> f64 {
    if spread == 0.0 || !spread.is_finite() {
        1.0
    } else {
        spread
    }
}

fn check_width(params: &ScalerParams, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != params.center.len() {
        return Err(TrainError::Shape {
            expected: format!("{} features", params.center.len()),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}
