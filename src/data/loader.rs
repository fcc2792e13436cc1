//! Dataset loading

use crate::error::{Result, TrainError};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Rows scanned to infer column types
const INFER_SCHEMA_ROWS: usize = 1000;

/// Loader for delimited text files with a header row
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader;

impl DatasetLoader {
    pub fn new() -> Self {
        Self
    }

    /// `.tsv` files are tab separated, everything else comma separated
    fn separator_for(&self, path: &Path) -> u8 {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        }
    }

    /// Load the file into a DataFrame, keeping column names and order
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TrainError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset not found: {}", path.display()),
            )));
        }

        let parse_opts = CsvParseOptions::default().with_separator(self.separator_for(path));

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| TrainError::Data(e.to_string()))?
            .finish()
            .map_err(|e| TrainError::Data(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Dataset loaded");
        Ok(df)
    }
}

/// Read a delimited file with a header row into an in-memory table
pub fn load_data(path: impl AsRef<Path>) -> Result<DataFrame> {
    DatasetLoader::new().load(path)
}
