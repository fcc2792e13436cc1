//! Dataset loading and train/test splitting
//!
//! - [`loader`] reads the delimited input file into a polars `DataFrame`
//! - [`split`] partitions it, writes the subsets and metadata files

pub mod loader;
pub mod split;

pub use loader::{load_data, DatasetLoader};
pub use split::{split_data, SplitData, SplitOptions};

use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Cast one column to f64 values; missing or non-numeric entries are errors
pub(crate) fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| TrainError::FeatureNotFound(name.to_string()))?;
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| TrainError::Data(format!("column '{}': {}", name, e)))?;
    let ca = cast
        .f64()
        .map_err(|e| TrainError::Data(e.to_string()))?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                TrainError::Data(format!(
                    "column '{}' has a missing or non-numeric value at row {}",
                    name, row
                ))
            })
        })
        .collect()
}

/// Extract named columns into a row-major feature matrix
pub fn to_feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let col_data: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| column_to_f64(df, name))
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((df.height(), columns.len()), |(r, c)| {
        col_data[c][r]
    }))
}

/// Extract a single column as a label vector
pub fn to_label_vector(df: &DataFrame, column: &str) -> Result<Array1<f64>> {
    Ok(Array1::from(column_to_f64(df, column)?))
}
