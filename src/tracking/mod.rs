//! Experiment Tracking Module
//!
//! A local, MLflow-like file store for experiments and runs. Runs are opened
//! with [`ExperimentTracker::start_run`] and closed by the returned
//! [`ActiveRun`] guard.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{ActiveRun, Experiment, ExperimentTracker, Metric, Run, RunStatus};
