//! Model file envelope
//!
//! A saved model is a bincode-encoded [`SerializedModel`]: magic bytes, a
//! format version, [`ModelMetadata`] and the bincode payload of the model
//! itself, guarded by an FNV-1a checksum.

use crate::error::{Result, TrainError};
use crate::training::{Classifier, Pipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// Model metadata stored alongside the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,
    /// Version of the crate that wrote the file
    pub version: String,
    /// When the model was fitted
    pub trained_at: DateTime<Utc>,
    /// Feature names, in column order
    pub feature_names: Vec<String>,
    /// Label column name
    pub target_name: String,
    /// Classifier class name
    pub model_type: String,
    /// Hyperparameters rendered as strings
    pub hyperparameters: BTreeMap<String, String>,
    /// Metrics at save time
    pub metrics: BTreeMap<String, f64>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            feature_names: Vec::new(),
            target_name: String::new(),
            model_type: String::new(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Metadata describing a fitted pipeline
    pub fn for_pipeline(name: impl Into<String>, pipeline: &Pipeline) -> Self {
        let hyperparameters = pipeline
            .get_params()
            .into_iter()
            .map(|(k, v)| {
                let rendered = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, rendered)
            })
            .collect();

        Self {
            model_type: pipeline.classifier().class_name().to_string(),
            hyperparameters,
            ..Self::new(name)
        }
    }

    /// Set feature names
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_names = features;
        self
    }

    /// Set target name
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_name = target.into();
        self
    }

    /// Add metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// On-disk envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModel {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub metadata: ModelMetadata,
    pub model_data: Vec<u8>,
    pub checksum: u64,
}

impl SerializedModel {
    pub const MAGIC: [u8; 4] = *b"TTPL";
    pub const VERSION: u32 = 1;

    pub fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    /// FNV-1a
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }

    /// Check magic, version and checksum
    fn validate(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(TrainError::Serialization(format!(
                "not a model file (magic {:?})",
                self.magic
            )));
        }
        if self.format_version != Self::VERSION {
            return Err(TrainError::Serialization(format!(
                "unsupported model format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(TrainError::Serialization(
                "checksum verification failed, file may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

/// Save any serializable model inside the envelope.
///
/// Missing parent directories are created.
pub fn save_model<M: Serialize>(model: &M, path: impl AsRef<Path>, metadata: ModelMetadata) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let model_data = bincode::serialize(model)?;
    let size = model_data.len();
    let serialized = SerializedModel::new(metadata, model_data);

    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, &serialized)?;

    debug!(path = %path.display(), payload_bytes = size, "Wrote model envelope");
    Ok(())
}

/// Load a model written by [`save_model`]
pub fn load_model<M: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<(M, ModelMetadata)> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let serialized: SerializedModel = bincode::deserialize_from(reader)?;
    serialized.validate()?;

    let model: M = bincode::deserialize(&serialized.model_data)?;
    Ok((model, serialized.metadata))
}

/// Save a fitted pipeline
pub fn save_pipeline(pipeline: &Pipeline, path: impl AsRef<Path>, metadata: ModelMetadata) -> Result<()> {
    if !pipeline.is_fitted() {
        return Err(TrainError::ModelNotFitted);
    }
    save_model(pipeline, path.as_ref(), metadata)?;
    info!(
        path = %path.as_ref().display(),
        classifier = pipeline.classifier_name(),
        "Saved pipeline"
    );
    Ok(())
}

/// Load a pipeline written by [`save_pipeline`]
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<(Pipeline, ModelMetadata)> {
    load_model(path)
}
