//! CSV loading and saving

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{error, info};

/// Reads delimited text files into a `DataFrame`
#[derive(Debug, Clone)]
pub struct DataLoader {
    delimiter: u8,
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Comma-delimited, header row, schema inferred from the first 100 rows
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: Some(100),
        }
    }

    /// Load a CSV file with a header row. Empty fields become nulls.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        match self.read(path) {
            Ok(df) => {
                info!(path = %path.display(), rows = df.height(), cols = df.width(), "Data loaded successfully");
                Ok(df)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error loading data");
                Err(e)
            }
        }
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ChurnError::DataError(e.to_string()))
    }

    /// Get file info without loading full data
    pub fn get_file_info(&self, path: impl AsRef<Path>) -> Result<FileInfo> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;

        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        let separator = self.delimiter as char;
        let columns: Vec<String> = header
            .split(separator)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(FileInfo {
            path: path.display().to_string(),
            file_size: metadata.len(),
            n_rows: lines.count(),
            n_cols: columns.len(),
            columns,
        })
    }
}

/// File information
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<String>,
}

/// Writes a `DataFrame` back to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row, creating the parent directory
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| ChurnError::DataError(e.to_string()))
    }
}
