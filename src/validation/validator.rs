//! Data validator

use super::{coerce_column, ExpectedSchema, SemanticType, ValidationOutcome, ValidationReport};
use crate::error::{ChurnError, Result};
use crate::utils::{column_names, distinct_non_null, duplicate_count};
use polars::prelude::*;
use tracing::{error, info};

/// Row count below which a warning is recorded
pub const DEFAULT_MIN_ROWS: usize = 50;

/// Validates tables against an [`ExpectedSchema`]
#[derive(Debug, Clone)]
pub struct DataValidator {
    schema: ExpectedSchema,
    min_rows: usize,
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::new(ExpectedSchema::default())
    }
}

impl DataValidator {
    pub fn new(schema: ExpectedSchema) -> Self {
        Self {
            schema,
            min_rows: DEFAULT_MIN_ROWS,
        }
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn schema(&self) -> &ExpectedSchema {
        &self.schema
    }

    /// Validate `df` and return the report with a type-coerced copy.
    ///
    /// Checks run in a fixed order: empty table, schema columns present,
    /// coercion, duplicate rows, missing values, constant columns, row count.
    /// Only the first two abort.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationOutcome> {
        let mut report = ValidationReport::new();

        if df.height() == 0 {
            error!("Dataset is empty");
            return Err(ChurnError::EmptyDataset);
        }

        let present = column_names(df);
        let missing: Vec<String> = self
            .schema
            .columns()
            .filter(|(name, _)| !present.iter().any(|p| p == name))
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            error!(columns = ?missing, "Missing expected columns");
            return Err(ChurnError::MissingColumns(missing));
        }

        let data = self.coerce(df, &mut report)?;

        let duplicates = duplicate_count(&data)?;
        if duplicates > 0 {
            report.warn(format!("{} duplicate rows found", duplicates));
        }

        for column in data.get_columns() {
            let nulls = column.null_count();
            if nulls > 0 {
                report.warn(format!("Column '{}' has {} missing values", column.name(), nulls));
            }
        }

        let mut constant = Vec::new();
        for column in data.get_columns() {
            if distinct_non_null(column.as_materialized_series())? <= 1 {
                constant.push(column.name().to_string());
            }
        }
        if !constant.is_empty() {
            report.warn(format!("Constant columns detected: {:?}", constant));
        }

        if data.height() < self.min_rows {
            report.warn(format!(
                "Dataset has only {} rows (minimum recommended {})",
                data.height(),
                self.min_rows
            ));
        }

        info!(rows = data.height(), cols = data.width(), "{}", report.summary());

        Ok(ValidationOutcome { report, data })
    }

    fn coerce(&self, df: &DataFrame, report: &mut ValidationReport) -> Result<DataFrame> {
        let mut data = df.clone();
        for (name, ty) in self.schema.columns() {
            if ty == SemanticType::Text {
                continue;
            }
            let series = data.column(name)?.as_materialized_series().clone();
            let coerced = coerce_column(&series, ty);
            if coerced.lost > 0 {
                report.warn(format!(
                    "Column '{}': {} value(s) could not be coerced to {}",
                    name, coerced.lost, ty
                ));
            }
            data.with_column(coerced.series)?;
        }
        Ok(data)
    }
}

/// Validate `df` against `schema` with the default row threshold
pub fn validate(df: &DataFrame, schema: &ExpectedSchema) -> Result<ValidationOutcome> {
    DataValidator::new(schema.clone()).validate(df)
}
