//! Error types for the training workflow

use thiserror::Error;

/// Result type alias for training workflow operations
pub type Result<T> = std::result::Result<T, TrainError>;

/// Main error type for the training workflow
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Column not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for TrainError {
    fn from(err: polars::error::PolarsError) -> Self {
        TrainError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for TrainError {
    fn from(err: serde_json::Error) -> Self {
        TrainError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for TrainError {
    fn from(err: bincode::Error) -> Self {
        TrainError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TrainError {
    fn from(err: ndarray::ShapeError) -> Self {
        TrainError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
