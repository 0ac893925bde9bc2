//! Missing value imputation strategies

use crate::error::{ChurnError, Result};
use crate::utils::median;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the median of the non-null values; the column becomes `Float64`
    Median,
    /// Replace with a constant string (text columns)
    ConstantString(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<(String, ImputeValue)>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column.
    ///
    /// A column with no observed values has no median; it is skipped with a
    /// warning and left untouched by [`Imputer::transform`].
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.fill_values.clear();
        for col_name in columns {
            let series = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.to_string()))?
                .as_materialized_series();

            match self.compute_fill_value(series)? {
                Some(value) => self.fill_values.push((col_name.to_string(), value)),
                None => warn!(column = %col_name, "Column has no observed values, cannot impute"),
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill nulls in every fitted column present in `df`
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill_value) in &self.fill_values {
            if let Ok(col) = df.column(col_name) {
                let filled = Self::fill_series(col.as_materialized_series(), fill_value)?;
                result.with_column(filled)?;
                info!(column = %col_name, "Filled missing values");
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fill value learned for `column`, if any
    pub fn numeric_fill(&self, column: &str) -> Option<f64> {
        self.fill_values.iter().find_map(|(name, value)| match value {
            ImputeValue::Numeric(v) if name == column => Some(*v),
            _ => None,
        })
    }

    fn compute_fill_value(&self, series: &Series) -> Result<Option<ImputeValue>> {
        match &self.strategy {
            ImputeStrategy::Median => Ok(median(series)?.map(ImputeValue::Numeric)),
            ImputeStrategy::ConstantString(val) => Ok(Some(ImputeValue::String(val.clone()))),
        }
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        match fill_value {
            ImputeValue::Numeric(val) => {
                let casted = series.cast(&DataType::Float64)?;
                let filled: Float64Chunked = casted
                    .f64()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
            ImputeValue::String(val) => {
                let filled: StringChunked = series
                    .str()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(val.as_str()).to_string()))
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
        }
    }
}
