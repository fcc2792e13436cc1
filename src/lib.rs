//! tabular-train - train, persist and track a tabular binary classifier
//!
//! One offline run reads a CSV dataset, splits it into train/test subsets
//! (written to disk), fits a scaler + classifier pipeline, evaluates it,
//! saves it, and records parameters and metrics in a local experiment store.
//!
//! # Modules
//!
//! - [`data`] - CSV loading and the seeded train/test splitter
//! - [`preprocessing`] - Standard and min-max scaling
//! - [`training`] - Logistic regression, decision tree, the two-stage pipeline
//! - [`evaluation`] - Accuracy, weighted F1, binary precision
//! - [`export`] - Model file envelope
//! - [`tracking`] - Experiments and runs
//! - [`driver`] - The end-to-end run
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data and models
pub mod data;
pub mod preprocessing;
pub mod training;
pub mod evaluation;

// Persistence and tracking
pub mod export;
pub mod tracking;

// Orchestration
pub mod driver;
pub mod cli;
pub mod utils;

pub use error::{Result, TrainError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::data::{load_data, split_data, SplitData, SplitOptions};
    pub use crate::driver::{run, RunSummary};
    pub use crate::error::{Result, TrainError};
    pub use crate::evaluation::{evaluate_model, EvaluationResult};
    pub use crate::export::{load_pipeline, save_pipeline, ModelMetadata};
    pub use crate::preprocessing::{Scaler, ScalerType};
    pub use crate::tracking::{ActiveRun, ExperimentTracker, Run, RunStatus};
    pub use crate::training::{
        build_model, build_pipeline, Classifier, DecisionTreeClassifier, Estimator,
        LogisticRegression, ModelType, Pipeline, Predictor,
    };
}
