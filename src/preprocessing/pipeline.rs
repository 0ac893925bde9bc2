//! Table cleaning stage

use super::imputer::{ImputeStrategy, Imputer};
use crate::config::PreprocessConfig;
use crate::error::Result;
use crate::utils::{column_names, drop_duplicate_rows, is_numeric, is_text};
use polars::prelude::*;
use tracing::info;

/// Deduplicates rows and imputes missing values.
///
/// Numeric columns with nulls are cast to `Float64` and filled with their
/// median; text columns are filled with a constant. Other dtypes pass through.
#[derive(Debug, Clone)]
pub struct DataPreprocessor {
    text_fill_value: String,
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPreprocessor {
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            text_fill_value: config.text_fill_value.clone(),
        }
    }

    pub fn with_text_fill_value(mut self, value: impl Into<String>) -> Self {
        self.text_fill_value = value.into();
        self
    }

    /// Clean `df` and return a new table; the input is not modified.
    ///
    /// Medians are taken after deduplication. Rows that only become identical
    /// once imputed are collapsed as well, which makes the stage idempotent.
    pub fn preprocess(&self, df: &DataFrame) -> Result<DataFrame> {
        info!(rows = df.height(), cols = df.width(), "Starting basic preprocessing");

        let mut data = drop_duplicates(df)?;

        let numeric = columns_with_nulls(&data, is_numeric);
        if !numeric.is_empty() {
            let cols: Vec<&str> = numeric.iter().map(String::as_str).collect();
            data = Imputer::new(ImputeStrategy::Median).fit_transform(&data, &cols)?;
        }

        let text = columns_with_nulls(&data, is_text);
        if !text.is_empty() {
            let cols: Vec<&str> = text.iter().map(String::as_str).collect();
            data = Imputer::new(ImputeStrategy::ConstantString(self.text_fill_value.clone()))
                .fit_transform(&data, &cols)?;
        }

        if !numeric.is_empty() || !text.is_empty() {
            data = drop_duplicates(&data)?;
        }

        info!(rows = data.height(), "Basic preprocessing completed successfully");
        Ok(data)
    }
}

/// Keep the first occurrence of every distinct row, preserving order
fn drop_duplicates(df: &DataFrame) -> Result<DataFrame> {
    let deduped = drop_duplicate_rows(df)?;
    let duplicates = df.height() - deduped.height();
    if duplicates > 0 {
        info!(duplicates, "Removed duplicate rows");
    }
    Ok(deduped)
}

fn columns_with_nulls(df: &DataFrame, kind: fn(&DataType) -> bool) -> Vec<String> {
    column_names(df)
        .into_iter()
        .zip(df.get_columns())
        .filter(|(_, col)| kind(col.dtype()) && col.null_count() > 0)
        .map(|(name, _)| name)
        .collect()
}
