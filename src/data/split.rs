//! Seeded train/test splitting with on-disk subsets and metadata

use super::{to_feature_matrix, to_label_vector};
use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Header of the distinct-target metadata file
pub const TARGET_LABELS_HEADER: &str = "target_labels";

/// Options for [`split_data`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOptions {
    /// Column separated out as the label vector
    pub label_column: String,
    /// Column whose distinct values go to `target_path`.
    /// Independent of `label_column`.
    pub target_values_column: String,
    /// Fraction of rows in the test side, in (0, 1)
    pub test_size: f64,
    /// Shuffle seed
    pub random_state: u64,
    /// Existing directory for the four subset files
    pub output_dir: PathBuf,
    /// Feature names, one per line, no header
    pub features_path: PathBuf,
    /// Distinct target values under a `target_labels` header
    pub target_path: PathBuf,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            target_values_column: "y".to_string(),
            test_size: 0.3,
            random_state: 7,
            output_dir: PathBuf::from("data/processed/"),
            features_path: PathBuf::from("features.csv"),
            target_path: PathBuf::from("target.csv"),
        }
    }
}

/// Train/test partition, row-aligned within each features/labels pair
#[derive(Debug, Clone)]
pub struct SplitData {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Original row index of each training row
    pub train_index: Vec<usize>,
    /// Original row index of each test row
    pub test_index: Vec<usize>,
    /// Feature column names in table order
    pub feature_names: Vec<String>,
}

impl SplitData {
    pub fn n_train(&self) -> usize {
        self.train_index.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_index.len()
    }
}

/// Number of test rows for `n_rows` rows; both sides keep at least one row
pub fn test_row_count(n_rows: usize, test_size: f64) -> usize {
    let n_test = (n_rows as f64 * test_size).round() as usize;
    n_test.clamp(1, n_rows.saturating_sub(1).max(1))
}

/// Seeded permutation of row positions, split into (train, test)
pub fn shuffle_split(n_rows: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut positions: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    positions.shuffle(&mut rng);

    let n_test = test_row_count(n_rows, test_size);
    let train = positions.split_off(n_test);
    (train, positions)
}

/// Split a table into train/test features and labels.
///
/// Writes `x_train.csv`, `y_train.csv`, `x_test.csv` and `y_test.csv` into
/// `opts.output_dir`, each led by the original row index, plus the feature
/// names to `opts.features_path` and the distinct values of
/// `opts.target_values_column` to `opts.target_path`.
pub fn split_data(df: &DataFrame, opts: &SplitOptions) -> Result<SplitData> {
    if !(opts.test_size > 0.0 && opts.test_size < 1.0) {
        return Err(TrainError::InvalidParameter {
            name: "test_size".to_string(),
            value: opts.test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }
    if df.height() < 2 {
        return Err(TrainError::InvalidInput(format!(
            "need at least 2 rows to split, got {}",
            df.height()
        )));
    }
    if df.column(&opts.label_column).is_err() {
        return Err(TrainError::FeatureNotFound(opts.label_column.clone()));
    }
    if df.column(&opts.target_values_column).is_err() {
        return Err(TrainError::FeatureNotFound(opts.target_values_column.clone()));
    }
    if !opts.output_dir.is_dir() {
        return Err(TrainError::Config(format!(
            "output directory does not exist: {}",
            opts.output_dir.display()
        )));
    }

    let features = df.drop(&opts.label_column)?;
    let labels = df.select([opts.label_column.as_str()])?;
    let feature_names: Vec<String> = features
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let x = to_feature_matrix(&features, &feature_names)?;
    let y = to_label_vector(&labels, &opts.label_column)?;

    let (train_index, test_index) = shuffle_split(df.height(), opts.test_size, opts.random_state);

    info!("Generating dataset for training");
    write_subset(&features, &train_index, &opts.output_dir.join("x_train.csv"))?;
    write_subset(&labels, &train_index, &opts.output_dir.join("y_train.csv"))?;
    info!("Generating dataset for testing");
    write_subset(&features, &test_index, &opts.output_dir.join("x_test.csv"))?;
    write_subset(&labels, &test_index, &opts.output_dir.join("y_test.csv"))?;

    info!("Generating metadata about dataset");
    write_feature_names(&feature_names, &opts.features_path)?;
    write_target_values(df, &opts.target_values_column, &opts.target_path)?;

    info!(
        train_rows = train_index.len(),
        test_rows = test_index.len(),
        features = feature_names.len(),
        "Dataset split"
    );

    Ok(SplitData {
        x_train: x.select(Axis(0), &train_index),
        x_test: x.select(Axis(0), &test_index),
        y_train: y.select(Axis(0), &train_index),
        y_test: y.select(Axis(0), &test_index),
        train_index,
        test_index,
        feature_names,
    })
}

/// Write the given rows with their original index as an unnamed first column
fn write_subset(frame: &DataFrame, rows: &[usize], path: &Path) -> Result<()> {
    let take_idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    let take_idx = IdxCa::from_vec("idx".into(), take_idx);
    let mut subset = frame.take(&take_idx)?;

    let original: Vec<u64> = rows.iter().map(|&r| r as u64).collect();
    subset.insert_column(0, Series::new("".into(), original))?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut subset)?;
    Ok(())
}

fn write_feature_names(names: &[String], path: &Path) -> Result<()> {
    let mut frame = DataFrame::new(vec![Column::new("feature".into(), names.to_vec())])?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(false)
        .finish(&mut frame)?;
    Ok(())
}

fn write_target_values(df: &DataFrame, column: &str, path: &Path) -> Result<()> {
    let distinct = df
        .column(column)
        .map_err(|_| TrainError::FeatureNotFound(column.to_string()))?
        .as_materialized_series()
        .unique_stable()?
        .with_name(TARGET_LABELS_HEADER.into());

    let mut frame = DataFrame::new(vec![distinct.into()])?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_row_counts() {
        assert_eq!(test_row_count(100, 0.3), 30);
        assert_eq!(test_row_count(10, 0.25), 3);
        assert_eq!(test_row_count(2, 0.01), 1);
        assert_eq!(test_row_count(2, 0.99), 1);
    }

    #[test]
    fn test_shuffle_split_is_disjoint_and_complete() {
        let (train, test) = shuffle_split(57, 0.3, 7);
        assert_eq!(train.len() + test.len(), 57);

        let train_set: HashSet<_> = train.iter().copied().collect();
        let test_set: HashSet<_> = test.iter().copied().collect();
        assert!(train_set.is_disjoint(&test_set));

        let all: HashSet<_> = train_set.union(&test_set).copied().collect();
        assert_eq!(all, (0..57).collect::<HashSet<_>>());
    }

    #[test]
    fn test_shuffle_split_is_seeded() {
        assert_eq!(shuffle_split(40, 0.3, 7), shuffle_split(40, 0.3, 7));
        assert_ne!(shuffle_split(40, 0.3, 7), shuffle_split(40, 0.3, 8));
    }
}
