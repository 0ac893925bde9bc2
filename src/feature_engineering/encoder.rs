//! Fitted categorical vocabulary

use crate::error::{ChurnError, Result};
use crate::utils::{column_names, is_text, sorted_categories};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// How one categorical column is encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnEncoding {
    /// Two categories mapped in place: `zero` → 0, `one` → 1
    Binary { zero: String, one: String },
    /// Indicator per category; `categories[0]` is the dropped reference
    OneHot { categories: Vec<String> },
}

impl ColumnEncoding {
    fn from_categories(mut categories: Vec<String>) -> Self {
        if categories.len() == 2 {
            let one = categories.pop().unwrap_or_default();
            let zero = categories.pop().unwrap_or_default();
            ColumnEncoding::Binary { zero, one }
        } else {
            ColumnEncoding::OneHot { categories }
        }
    }
}

/// Name of the indicator column for `category` of `column`
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Categorical encoder fitted on a training batch and replayed unchanged on
/// later batches.
///
/// Fitting records, per text column, either a binary mapping (exactly two
/// categories, lexicographic order) or a one-hot vocabulary (reference
/// category dropped), plus the exact output column order. Transforming a new
/// batch emits the same columns in the same order regardless of which
/// categories the batch happens to contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEncoder {
    target_column: String,
    id_columns: Vec<String>,
    encodings: Vec<(String, ColumnEncoding)>,
    output_columns: Vec<String>,
    is_fitted: bool,
}

impl FeatureEncoder {
    pub fn new(target_column: impl Into<String>, id_columns: Vec<String>) -> Self {
        Self {
            target_column: target_column.into(),
            id_columns,
            encodings: Vec::new(),
            output_columns: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Per-column encodings in fit order
    pub fn encodings(&self) -> &[(String, ColumnEncoding)] {
        &self.encodings
    }

    /// Predictor columns produced by [`FeatureEncoder::transform`], target excluded
    pub fn feature_names(&self) -> Vec<String> {
        self.output_columns
            .iter()
            .filter(|c| **c != self.target_column)
            .cloned()
            .collect()
    }

    /// Learn the vocabulary from `df`
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let retained: Vec<String> = column_names(df)
            .into_iter()
            .filter(|c| !self.id_columns.contains(c))
            .collect();

        let categorical: Vec<String> = retained
            .iter()
            .filter(|c| **c != self.target_column)
            .filter(|c| df.column(c).map(|col| is_text(col.dtype())).unwrap_or(false))
            .cloned()
            .collect();
        info!(columns = ?categorical, "Categorical columns detected");

        let mut encodings = Vec::with_capacity(categorical.len());
        for name in &categorical {
            let categories = sorted_categories(df.column(name)?.as_materialized_series())?;
            let encoding = ColumnEncoding::from_categories(categories);
            match &encoding {
                ColumnEncoding::Binary { .. } => debug!(column = %name, "Label encoded binary column"),
                ColumnEncoding::OneHot { categories } => debug!(
                    column = %name,
                    indicators = categories.len().saturating_sub(1),
                    "One-hot encoded column"
                ),
            }
            encodings.push((name.clone(), encoding));
        }

        let mut output_columns: Vec<String> = retained
            .into_iter()
            .filter(|c| {
                !encodings
                    .iter()
                    .any(|(n, e)| n == c && matches!(e, ColumnEncoding::OneHot { .. }))
            })
            .collect();
        for (name, encoding) in &encodings {
            if let ColumnEncoding::OneHot { categories } = encoding {
                output_columns.extend(categories.iter().skip(1).map(|cat| indicator_name(name, cat)));
            }
        }

        self.encodings = encodings;
        self.output_columns = output_columns;
        self.is_fitted = true;
        Ok(self)
    }

    /// Apply the fitted vocabulary to `df`.
    ///
    /// The target column is optional so unlabeled batches can be scored.
    /// Every other fitted column must be present.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }

        let mut indicators: HashMap<String, (&str, &str)> = HashMap::new();
        let mut binaries: HashMap<&str, (&str, &str)> = HashMap::new();
        for (name, encoding) in &self.encodings {
            match encoding {
                ColumnEncoding::Binary { zero, one } => {
                    binaries.insert(name.as_str(), (zero.as_str(), one.as_str()));
                }
                ColumnEncoding::OneHot { categories } => {
                    for cat in categories.iter().skip(1) {
                        indicators.insert(indicator_name(name, cat), (name.as_str(), cat.as_str()));
                    }
                }
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.output_columns.len());
        for name in &self.output_columns {
            if *name == self.target_column {
                if let Ok(col) = df.column(name) {
                    columns.push(encode_target(col.as_materialized_series())?.into());
                }
                continue;
            }

            let column = if let Some((source, category)) = indicators.get(name) {
                let text = text_column(df, source)?;
                let values: Int32Chunked = text
                    .str()?
                    .into_iter()
                    .map(|v| Some(i32::from(v == Some(*category))))
                    .collect();
                values.with_name(name.as_str().into()).into_series()
            } else if let Some((zero, one)) = binaries.get(name.as_str()) {
                let text = text_column(df, name)?;
                let values: Int32Chunked = text
                    .str()?
                    .into_iter()
                    .map(|v| match v {
                        Some(v) if v == *zero => Some(0),
                        Some(v) if v == *one => Some(1),
                        _ => None,
                    })
                    .collect();
                let unseen = values.null_count().saturating_sub(text.null_count());
                if unseen > 0 {
                    warn!(column = %name, count = unseen, "Unseen categories encoded as null");
                }
                values.with_name(name.as_str().into()).into_series()
            } else {
                df.column(name)
                    .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?
                    .as_materialized_series()
                    .clone()
            };
            columns.push(column.into());
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Fit on `df` and transform it
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

fn text_column(df: &DataFrame, name: &str) -> Result<Series> {
    let series = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();
    Ok(series.cast(&DataType::String)?)
}

/// Map `"Yes"`/`"No"` to 1/0; anything else becomes null.
/// A target that is already numeric is only cast to `Int32`.
pub fn encode_target(series: &Series) -> Result<Series> {
    if !is_text(series.dtype()) {
        return Ok(series.cast(&DataType::Int32)?);
    }

    let encoded: Int32Chunked = series
        .str()?
        .into_iter()
        .map(|v| match v {
            Some("Yes") => Some(1),
            Some("No") => Some(0),
            _ => None,
        })
        .collect();

    let unmapped = encoded.null_count().saturating_sub(series.null_count());
    if unmapped > 0 {
        warn!(column = %series.name(), count = unmapped, "Target values outside Yes/No set to null");
    }
    info!(column = %series.name(), "Encoded target column");
    Ok(encoded.with_name(series.name().clone()).into_series())
}
