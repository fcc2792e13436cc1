//! Run configuration

use crate::data::SplitOptions;
use crate::error::{Result, TrainError};
use crate::preprocessing::ScalerType;
use crate::training::ModelType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one end-to-end training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Input CSV file
    pub data_path: PathBuf,

    /// Column used as the classification label
    pub label_column: String,

    /// Column whose distinct values are written to the target metadata file
    pub target_values_column: String,

    /// Fraction of rows held out for testing
    pub test_size: f64,

    /// Seed for the train/test shuffle
    pub random_state: u64,

    /// Directory receiving x_train/y_train/x_test/y_test
    pub output_dir: PathBuf,

    /// Feature-name metadata file
    pub features_path: PathBuf,

    /// Distinct-target metadata file
    pub target_path: PathBuf,

    /// Where the fitted pipeline is written
    pub model_path: PathBuf,

    /// Root of the local experiment store
    pub tracking_dir: PathBuf,

    /// Experiment the run is recorded under
    pub experiment_name: String,

    /// Scaling stage of the pipeline
    pub scaler: ScalerType,

    /// Classifier stage of the pipeline
    pub model: ModelType,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/bank-additional-full_encoded.csv"),
            label_column: "y".to_string(),
            target_values_column: "y".to_string(),
            test_size: 0.3,
            random_state: 7,
            output_dir: PathBuf::from("data/processed/"),
            features_path: PathBuf::from("features.csv"),
            target_path: PathBuf::from("target.csv"),
            model_path: PathBuf::from("models/pipe_lr.pkl"),
            tracking_dir: PathBuf::from("mlruns"),
            experiment_name: "Default".to_string(),
            scaler: ScalerType::Standard,
            model: ModelType::LogisticRegression,
        }
    }
}

impl RunConfig {
    /// Create a config reading from the given data file
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    pub fn with_target_values_column(mut self, column: impl Into<String>) -> Self {
        self.target_values_column = column.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_features_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.features_path = path.into();
        self
    }

    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = path.into();
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_tracking_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tracking_dir = dir.into();
        self
    }

    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn with_scaler(mut self, scaler: ScalerType) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn with_model(mut self, model: ModelType) -> Self {
        self.model = model;
        self
    }

    /// Check the values that can be checked before touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TrainError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.label_column.is_empty() {
            return Err(TrainError::Config("label column must not be empty".to_string()));
        }
        if self.target_values_column.is_empty() {
            return Err(TrainError::Config(
                "target values column must not be empty".to_string(),
            ));
        }
        if self.experiment_name.is_empty() {
            return Err(TrainError::Config("experiment name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Options handed to the splitter
    pub fn split_options(&self) -> SplitOptions {
        SplitOptions {
            label_column: self.label_column.clone(),
            target_values_column: self.target_values_column.clone(),
            test_size: self.test_size,
            random_state: self.random_state,
            output_dir: self.output_dir.clone(),
            features_path: self.features_path.clone(),
            target_path: self.target_path.clone(),
        }
    }

    /// Load a config saved as JSON; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save the config as pretty JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
