//! Command-line interface
//!
//! Without a subcommand the binary performs one training run; every flag
//! falls back to the built-in default. `inspect` prints what a saved
//! model file contains.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::driver::{self, RunSummary};
use crate::export::load_pipeline;
use crate::preprocessing::ScalerType;
use crate::training::ModelType;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabular-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a binary classifier on a CSV dataset and track the run")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the metadata and hyperparameters of a saved model
    Inspect {
        /// Model file written by a training run
        #[arg(short, long)]
        model: PathBuf,
    },
}

/// Training-run flags; unset flags keep the config-file or default value
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON run configuration to start from
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input CSV file
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Label column
    #[arg(long)]
    pub label: Option<String>,

    /// Column whose distinct values go to the target metadata file
    #[arg(long)]
    pub target_values_column: Option<String>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for the train/test CSVs (must exist)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Feature-name metadata file
    #[arg(long)]
    pub features_path: Option<PathBuf>,

    /// Distinct-target metadata file
    #[arg(long)]
    pub target_path: Option<PathBuf>,

    /// Where to write the fitted pipeline
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Experiment store root
    #[arg(long)]
    pub tracking_dir: Option<PathBuf>,

    /// Experiment name
    #[arg(long)]
    pub experiment: Option<String>,

    /// Scaler stage (standard, minmax)
    #[arg(long)]
    pub scaler: Option<ScalerType>,

    /// Classifier stage (logistic_regression, decision_tree)
    #[arg(long)]
    pub model: Option<ModelType>,
}

impl RunArgs {
    /// Merge flags over the config file (or the defaults)
    pub fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(v) = self.data { config.data_path = v; }
        if let Some(v) = self.label { config.label_column = v; }
        if let Some(v) = self.target_values_column { config.target_values_column = v; }
        if let Some(v) = self.test_size { config.test_size = v; }
        if let Some(v) = self.seed { config.random_state = v; }
        if let Some(v) = self.output_dir { config.output_dir = v; }
        if let Some(v) = self.features_path { config.features_path = v; }
        if let Some(v) = self.target_path { config.target_path = v; }
        if let Some(v) = self.model_path { config.model_path = v; }
        if let Some(v) = self.tracking_dir { config.tracking_dir = v; }
        if let Some(v) = self.experiment { config.experiment_name = v; }
        if let Some(v) = self.scaler { config.scaler = v; }
        if let Some(v) = self.model { config.model = v; }

        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(config: &RunConfig) -> anyhow::Result<()> {
    section("Train");
    println!("  {:<12} {}", muted("Data"), config.data_path.display());
    println!("  {:<12} {}", muted("Label"), config.label_column);
    println!("  {:<12} {} → {}", muted("Pipeline"), config.scaler, config.model);
    println!();

    step_run("Preprocessing data, fitting and evaluating");
    let summary = driver::run(config)?;
    let total = summary.stage_secs.last().map_or(0.0, |(_, secs)| *secs);
    step_ok(&format!("done in {:.2}s", total));

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    line_box_top();
    line_box(&kv("Model     ", &summary.model_class));
    line_box(&kv("Rows      ", &format!("{} train / {} test", summary.n_train, summary.n_test)));
    line_box(&kv("Features  ", &summary.feature_names.len().to_string()));
    let stages: Vec<String> = summary
        .stage_secs
        .iter()
        .map(|(stage, secs)| format!("{} {:.2}s", stage, secs))
        .collect();
    line_box(&kv("Stages    ", &stages.join(", ")));
    line_box_sep();
    for (name, value) in &summary.metrics {
        line_box(&kv(&format!("{:<22}", name), &format!("{:.4}", value)));
    }
    line_box_sep();
    line_box(&kv("Saved     ", &summary.model_path.display().to_string()));
    line_box(&kv("Run       ", &format!("{} ({})", summary.run_id, summary.experiment_name)));
    line_box_bottom();
    println!();
}

pub fn cmd_inspect(model_path: &Path) -> anyhow::Result<()> {
    section("Model");

    let (pipeline, metadata) = load_pipeline(model_path)?;

    println!("  {:<14} {}", muted("File"), model_path.display());
    println!("  {:<14} {}", muted("Name"), metadata.name);
    println!("  {:<14} {}", muted("Classifier"), pipeline.classifier_name().cyan());
    println!("  {:<14} {}", muted("Scaler"), pipeline.scaler().class_name());
    println!("  {:<14} {}", muted("Trained at"), metadata.trained_at.to_rfc3339());
    println!("  {:<14} v{}", muted("Written by"), metadata.version);
    println!("  {:<14} {}", muted("Target"), metadata.target_name);
    println!("  {:<14} {}", muted("Features"), metadata.feature_names.join(", "));

    section("Hyperparameters");
    for (name, value) in pipeline.get_params() {
        if name == "steps" {
            continue;
        }
        println!("  {:<28} {}", muted(&name), value);
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["tabular-train"]).unwrap();
        assert!(cli.command.is_none());
        let config = cli.run.into_config().unwrap();
        let defaults = RunConfig::default();
        assert_eq!(config.data_path, defaults.data_path);
        assert_eq!(config.label_column, "y");
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.random_state, 7);
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::try_parse_from([
            "tabular-train",
            "--label",
            "label",
            "--test-size",
            "0.25",
            "--scaler",
            "minmax",
            "--model",
            "decision_tree",
        ])
        .unwrap();
        let config = cli.run.into_config().unwrap();
        assert_eq!(config.label_column, "label");
        assert_eq!(config.test_size, 0.25);
        assert_eq!(config.scaler, ScalerType::MinMax);
        assert_eq!(config.model, ModelType::DecisionTree);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        RunConfig::new("from_file.csv")
            .with_random_state(11)
            .save_json(&path)
            .unwrap();

        let args = RunArgs {
            config: Some(path),
            seed: Some(3),
            ..Default::default()
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.data_path, PathBuf::from("from_file.csv"));
        assert_eq!(config.random_state, 3);
    }

    #[test]
    fn test_invalid_test_size_rejected() {
        let args = RunArgs {
            test_size: Some(1.5),
            ..Default::default()
        };
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_inspect_subcommand() {
        let cli = Cli::try_parse_from(["tabular-train", "inspect", "--model", "m.pkl"]).unwrap();
        match cli.command {
            Some(Commands::Inspect { model }) => assert_eq!(model, PathBuf::from("m.pkl")),
            _ => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }
}
