//! Experiment Tracker Implementation
//!
//! Track experiments, parameters, metrics and artifacts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::storage::{LocalStorage, StorageBackend};
use crate::error::{Result, TrainError};

/// A single metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    /// Step number; counts previous values logged under the same name
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A run within an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: String,
    pub start_time: DateTime<Utc>,
    /// `None` while the run is open
    pub end_time: Option<DateTime<Utc>>,
    pub params: BTreeMap<String, String>,
    /// Latest value of each metric
    pub metrics: BTreeMap<String, f64>,
    pub metrics_history: Vec<Metric>,
    pub tags: BTreeMap<String, String>,
    pub artifacts: Vec<String>,
    pub status: RunStatus,
}

impl Run {
    pub fn new(experiment_id: impl Into<String>, run_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            experiment_id: experiment_id.into(),
            run_name: run_name.into(),
            start_time: Utc::now(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            metrics_history: Vec::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Run duration in seconds, up to now if still open
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// An experiment groups runs under a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
}

impl Experiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            experiment_id: Uuid::new_v4().simple().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            tags: BTreeMap::new(),
        }
    }
}

/// Experiment tracker over a storage backend
pub struct ExperimentTracker {
    storage: Box<dyn StorageBackend>,
}

impl ExperimentTracker {
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Tracker backed by a local directory
    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(LocalStorage::new(root)))
    }

    pub fn list_experiments(&self) -> Result<Vec<Experiment>> {
        self.storage.load_experiments()
    }

    pub fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        Ok(self
            .storage
            .load_experiments()?
            .into_iter()
            .find(|e| e.name == name))
    }

    /// Look up an experiment by name, creating it if absent
    pub fn get_or_create_experiment(&self, name: &str) -> Result<Experiment> {
        let mut experiments = self.storage.load_experiments()?;
        if let Some(existing) = experiments.iter().find(|e| e.name == name) {
            return Ok(existing.clone());
        }

        let experiment = Experiment::new(name);
        experiments.push(experiment.clone());
        self.storage.save_experiments(&experiments)?;
        info!(experiment = name, id = %experiment.experiment_id, "Created experiment");
        Ok(experiment)
    }

    /// All stored runs of the named experiment
    pub fn list_runs(&self, experiment_name: &str) -> Result<Vec<Run>> {
        match self.get_experiment_by_name(experiment_name)? {
            Some(experiment) => self.storage.load_runs(&experiment.experiment_id),
            None => Ok(Vec::new()),
        }
    }

    /// Open a run in the named experiment.
    ///
    /// The returned guard records into the run until [`ActiveRun::finish`]
    /// is called; dropping it unfinished stores the run as `FAILED`.
    pub fn start_run(&self, experiment_name: &str, run_name: impl Into<String>) -> Result<ActiveRun<'_>> {
        let experiment = self.get_or_create_experiment(experiment_name)?;
        let run = Run::new(experiment.experiment_id, run_name);
        info!(run_id = %run.run_id, experiment = experiment_name, "Started run");
        Ok(ActiveRun {
            tracker: self,
            run: Some(run),
        })
    }

    fn store(&self, run: &Run) -> Result<()> {
        self.storage.save_run(run)
    }
}

/// An open run. Ends on [`finish`](ActiveRun::finish) or on drop.
pub struct ActiveRun<'a> {
    tracker: &'a ExperimentTracker,
    run: Option<Run>,
}

impl<'a> ActiveRun<'a> {
    fn record(&mut self) -> Result<&mut Run> {
        self.run
            .as_mut()
            .ok_or_else(|| TrainError::Tracking("run already ended".to_string()))
    }

    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    pub fn run_id(&self) -> &str {
        self.run.as_ref().map(|r| r.run_id.as_str()).unwrap_or_default()
    }

    /// Log a parameter. Re-logging a key with a different value is an error.
    pub fn log_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        let run = self.record()?;
        if let Some(previous) = run.params.get(&key) {
            if *previous != value {
                return Err(TrainError::Tracking(format!(
                    "param '{}' already logged with a different value",
                    key
                )));
            }
        }
        run.params.insert(key, value);
        Ok(())
    }

    pub fn log_params<K, V>(&mut self, params: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.log_param(key, value)?;
        }
        Ok(())
    }

    /// Log a metric; the latest value wins, all values are kept in history
    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) -> Result<()> {
        let name = name.into();
        let run = self.record()?;
        let step = run.metrics_history.iter().filter(|m| m.name == name).count() as u64;
        run.metrics_history.push(Metric {
            name: name.clone(),
            value,
            step,
            timestamp: Utc::now(),
        });
        run.metrics.insert(name, value);
        Ok(())
    }

    pub fn log_metrics<K: Into<String>>(&mut self, metrics: impl IntoIterator<Item = (K, f64)>) -> Result<()> {
        for (name, value) in metrics {
            self.log_metric(name, value)?;
        }
        Ok(())
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.record()?.tags.insert(key.into(), value.into());
        Ok(())
    }

    /// Record the path of a file produced by this run
    pub fn log_artifact(&mut self, path: impl Into<String>) -> Result<()> {
        self.record()?.artifacts.push(path.into());
        Ok(())
    }

    fn end(&mut self, status: RunStatus) -> Result<Run> {
        let mut run = self
            .run
            .take()
            .ok_or_else(|| TrainError::Tracking("run already ended".to_string()))?;
        run.status = status;
        run.end_time = Some(Utc::now());
        self.tracker.store(&run)?;
        Ok(run)
    }

    /// End the run as `FINISHED` and persist it
    pub fn finish(mut self) -> Result<Run> {
        let run = self.end(RunStatus::Finished)?;
        info!(
            run_id = %run.run_id,
            params = run.params.len(),
            metrics = run.metrics.len(),
            duration_secs = run.duration_secs(),
            "Finished run"
        );
        Ok(run)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.run.is_none() {
            return;
        }
        match self.end(RunStatus::Failed) {
            Ok(run) => warn!(run_id = %run.run_id, "Run ended without finishing, marked FAILED"),
            Err(e) => warn!(error = %e, "Failed to persist unfinished run"),
        }
    }
}
