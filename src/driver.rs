//! End-to-end training run
//!
//! load → split → fit pipeline → evaluate → open tracking run → save model →
//! log params → re-evaluate → log metrics → finish run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RunConfig;
use crate::data::{load_data, split_data};
use crate::error::Result;
use crate::evaluation::evaluate_model;
use crate::export::{save_pipeline, ModelMetadata};
use crate::preprocessing::Scaler;
use crate::tracking::ExperimentTracker;
use crate::training::build_pipeline;
use crate::utils::Timer;

/// Prefix of every metric logged to the tracker
pub const METRIC_PREFIX: &str = "train__";
/// Param holding the classifier class name
pub const MODEL_CLASS_PARAM: &str = "model_class";
/// Param holding the pipeline hyperparameters as JSON
pub const PIPELINE_PARAM: &str = "pipe_lr";
/// Name given to tracking runs
pub const RUN_NAME: &str = "pipe_lr";

/// What a finished run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub experiment_name: String,
    pub model_class: String,
    pub model_path: PathBuf,
    /// Logged metrics, keys carry the `train__` prefix
    pub metrics: BTreeMap<String, f64>,
    pub feature_names: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    /// Seconds since the run started, recorded after each stage
    pub stage_secs: Vec<(String, f64)>,
}

/// Execute one training run.
///
/// Failures propagate unchanged. Files written before a failure stay on disk;
/// a failure after the tracking run is opened leaves that run stored as
/// `FAILED`.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    let mut timer = Timer::start("training run");

    let df = load_data(&config.data_path)?;
    info!(path = %config.data_path.display(), rows = df.height(), columns = df.width(), "Loaded dataset");
    timer.checkpoint("load");

    let split = split_data(&df, &config.split_options())?;
    timer.checkpoint("split");

    let pipeline = build_pipeline(
        config.model.build(),
        &split.x_train,
        &split.y_train,
        Scaler::new(config.scaler),
    )?;
    timer.checkpoint("fit");

    let model_class = pipeline.classifier_name().to_string();
    evaluate_model(&pipeline, &model_class, &split.x_test, &split.y_test)?;

    let tracker = ExperimentTracker::with_dir(&config.tracking_dir);
    let mut active = tracker.start_run(&config.experiment_name, RUN_NAME)?;

    let metadata = ModelMetadata::for_pipeline(RUN_NAME, &pipeline)
        .with_features(split.feature_names.clone())
        .with_target(config.label_column.clone());
    save_pipeline(&pipeline, &config.model_path, metadata)?;
    active.log_artifact(config.model_path.display().to_string())?;

    active.log_param(MODEL_CLASS_PARAM, model_class.clone())?;
    active.log_param(PIPELINE_PARAM, serde_json::to_string(&pipeline.get_params())?)?;

    let evaluation = evaluate_model(&pipeline, &model_class, &split.x_test, &split.y_test)?;
    let metrics: BTreeMap<String, f64> = evaluation
        .into_metrics()
        .into_iter()
        .map(|(name, value)| (format!("{}{}", METRIC_PREFIX, name), value))
        .collect();
    active.log_metrics(metrics.clone())?;

    let run = active.finish()?;
    timer.checkpoint("track");
    let stage_secs = timer
        .checkpoints()
        .iter()
        .map(|(stage, at)| (stage.clone(), at.as_secs_f64()))
        .collect();
    timer.stop();

    Ok(RunSummary {
        run_id: run.run_id,
        experiment_name: config.experiment_name.clone(),
        model_class,
        model_path: config.model_path.clone(),
        metrics,
        feature_names: split.feature_names,
        n_train: split.train_index.len(),
        n_test: split.test_index.len(),
        stage_secs,
    })
}
