//! Data preprocessing module
//!
//! Provides the cleaning stage of the pipeline and the numeric helpers used
//! around it:
//! - Duplicate removal and missing value imputation ([`DataPreprocessor`])
//! - Feature scaling on dense matrices ([`FeatureScaler`])
//! - Per-column dataset profiling ([`profile`])

mod imputer;
mod pipeline;
mod scaler;

pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::DataPreprocessor;
pub use scaler::{FeatureScaler, ScalerType};

use crate::error::Result;
use crate::utils::{is_numeric, is_text};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column data type for profiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Boolean,
    Unknown,
}

/// Per-column statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStats {
    pub name: String,
    pub dtype: ColumnType,
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    pub unique_count: Option<usize>,
    /// Most frequent categories with their counts, most common first
    pub top_categories: Option<Vec<(String, usize)>>,
}

impl FeatureStats {
    /// Create new feature statistics
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            count: 0,
            null_count: 0,
            mean: None,
            std: None,
            min: None,
            max: None,
            median: None,
            unique_count: None,
            top_categories: None,
        }
    }

    /// Compute statistics from a numeric series
    pub fn from_numeric_series(name: &str, series: &Series) -> Result<Self> {
        let mut stats = Self::new(name, ColumnType::Numeric);
        stats.count = series.len();
        stats.null_count = series.null_count();
        stats.unique_count = Some(series.drop_nulls().n_unique()?);

        let casted = series.cast(&DataType::Float64)?;
        let ca = casted.f64()?;
        stats.mean = ca.mean();
        stats.std = ca.std(1);
        stats.min = ca.min();
        stats.max = ca.max();
        stats.median = ca.median();

        Ok(stats)
    }

    /// Compute statistics from a categorical series
    pub fn from_categorical_series(name: &str, series: &Series, top_k: usize) -> Result<Self> {
        let mut stats = Self::new(name, ColumnType::Categorical);
        stats.count = series.len();
        stats.null_count = series.null_count();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in series.str()?.into_iter().flatten() {
            *counts.entry(value).or_insert(0) += 1;
        }
        stats.unique_count = Some(counts.len());

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_k);
        stats.top_categories = Some(ranked);

        Ok(stats)
    }
}

/// Profile every column of `df`, in table order
pub fn profile(df: &DataFrame, top_k: usize) -> Result<Vec<FeatureStats>> {
    df.get_columns()
        .iter()
        .map(|column| {
            let name = column.name().as_str();
            let series = column.as_materialized_series();
            let dtype = series.dtype();
            if is_numeric(dtype) {
                FeatureStats::from_numeric_series(name, series)
            } else if is_text(dtype) {
                FeatureStats::from_categorical_series(name, series, top_k)
            } else {
                let kind = if dtype == &DataType::Boolean {
                    ColumnType::Boolean
                } else {
                    ColumnType::Unknown
                };
                let mut stats = FeatureStats::new(name, kind);
                stats.count = series.len();
                stats.null_count = series.null_count();
                stats.unique_count = Some(series.drop_nulls().n_unique()?);
                Ok(stats)
            }
        })
        .collect()
}
