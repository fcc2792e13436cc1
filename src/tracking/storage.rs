//! Storage Backend for Experiment Tracking
//!
//! Layout under the tracking root:
//! - `experiments.json`: index of all experiments
//! - `<experiment_id>/<run_id>/run.json`: one record per finished run

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::tracker::{Experiment, Run};
use crate::error::{Result, TrainError};

const EXPERIMENTS_FILE: &str = "experiments.json";
const RUN_FILE: &str = "run.json";

/// Storage backend trait
pub trait StorageBackend {
    /// Load the experiment index; empty when nothing was stored yet
    fn load_experiments(&self) -> Result<Vec<Experiment>>;

    /// Replace the experiment index
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()>;

    /// Write (or overwrite) one run record
    fn save_run(&self, run: &Run) -> Result<()>;

    /// All stored runs of an experiment, oldest first
    fn load_runs(&self, experiment_id: &str) -> Result<Vec<Run>>;
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join(EXPERIMENTS_FILE)
    }

    fn run_file(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.base_dir.join(experiment_id).join(run_id).join(RUN_FILE)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            TrainError::Tracking(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    let file = File::create(path)
        .map_err(|e| TrainError::Tracking(format!("Failed to create {}: {}", path.display(), e)))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| TrainError::Tracking(format!("Failed to write {}: {}", path.display(), e)))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| TrainError::Tracking(format!("Failed to open {}: {}", path.display(), e)))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TrainError::Tracking(format!("Failed to parse {}: {}", path.display(), e)))
}

impl StorageBackend for LocalStorage {
    fn load_experiments(&self) -> Result<Vec<Experiment>> {
        let path = self.experiments_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()> {
        write_json(&self.experiments_file(), experiments)
    }

    fn save_run(&self, run: &Run) -> Result<()> {
        let path = self.run_file(&run.experiment_id, &run.run_id);
        write_json(&path, run)?;
        debug!(path = %path.display(), "Stored run");
        Ok(())
    }

    fn load_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let dir = self.base_dir.join(experiment_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        let entries = fs::read_dir(&dir)
            .map_err(|e| TrainError::Tracking(format!("Failed to list {}: {}", dir.display(), e)))?;
        for entry in entries {
            let entry = entry.map_err(|e| TrainError::Tracking(e.to_string()))?;
            let path = entry.path().join(RUN_FILE);
            if path.is_file() {
                runs.push(read_json::<Run>(&path)?);
            }
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(runs)
    }
}
