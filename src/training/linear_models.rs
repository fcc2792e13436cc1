//! Linear model implementations

use super::{check_lengths, unique_labels, Classifier, Predictor};
use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Logistic regression for binary classification.
///
/// Minimises the mean log-loss plus `||w||² / (2·C·n)` by full-batch
/// gradient descent. The intercept is not penalised. Labels may be any two
/// distinct values; the larger one is the positive class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Class labels seen during fit, sorted; `classes[1]` is positive
    pub classes: Vec<f64>,
    /// Inverse regularization strength
    pub c: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Iterations run by the last fit
    pub n_iter: usize,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            classes: Vec::new(),
            c: 1.0,
            fit_intercept: true,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            n_iter: 0,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sigmoid function
    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    fn validate_params(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(TrainError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(TrainError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Fit the model using gradient descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_lengths(x, y)?;
        self.validate_params()?;

        let classes = unique_labels(y.iter());
        if classes.len() != 2 {
            return Err(TrainError::Training(format!(
                "LogisticRegression needs exactly 2 classes, got {}: {:?}",
                classes.len(),
                classes
            )));
        }
        let positive = classes[1];
        let target = y.mapv(|v| if v == positive { 1.0 } else { 0.0 });

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();
        let penalty = 1.0 / (self.c * n_samples);

        // Initialize weights
        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;
        let lr = self.learning_rate;

        let mut converged = false;
        let mut iterations = 0;
        for _ in 0..self.max_iter {
            iterations += 1;

            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - &target;
            let dw = (x.t().dot(&errors) / n_samples) + (penalty * &weights);
            let db = if self.fit_intercept {
                errors.mean().unwrap_or(0.0)
            } else {
                0.0
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                converged = true;
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        if converged {
            debug!(iterations, "LogisticRegression converged");
        } else {
            warn!(
                max_iter = self.max_iter,
                "LogisticRegression did not converge; consider scaling the data or raising max_iter"
            );
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.classes = classes;
        self.n_iter = iterations;
        self.is_fitted = true;

        Ok(self)
    }

    fn fitted(&self) -> Result<(&Array1<f64>, f64)> {
        match (&self.coefficients, self.intercept) {
            (Some(coef), Some(intercept)) if self.is_fitted => Ok((coef, intercept)),
            _ => Err(TrainError::ModelNotFitted),
        }
    }

    /// Signed distance to the decision boundary
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (coefficients, intercept) = self.fitted()?;
        if x.ncols() != coefficients.len() {
            return Err(TrainError::Shape {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + intercept)
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Self::sigmoid(&self.decision_function(x)?))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let (negative, positive) = (self.classes[0], self.classes[1]);
        Ok(proba.mapv(|p| if p > 0.5 { positive } else { negative }))
    }
}

impl Predictor for LogisticRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn class_name(&self) -> &'static str {
        "LogisticRegression"
    }

    fn hyperparameters(&self) -> BTreeMap<String, Value> {
        let mut params = BTreeMap::new();
        params.insert("C".to_string(), json!(self.c));
        params.insert("fit_intercept".to_string(), json!(self.fit_intercept));
        params.insert("learning_rate".to_string(), json!(self.learning_rate));
        params.insert("max_iter".to_string(), json!(self.max_iter));
        params.insert("penalty".to_string(), json!("l2"));
        params.insert("solver".to_string(), json!("gradient_descent"));
        params.insert("tol".to_string(), json!(self.tol));
        params
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
