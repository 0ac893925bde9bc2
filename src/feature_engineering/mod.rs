//! Feature engineering module
//!
//! Turns a cleaned table into an all-numeric one: identifier columns are
//! dropped, the target is mapped to 0/1 and text predictors are encoded by a
//! [`FeatureEncoder`] whose vocabulary is kept for inference.

mod encoder;

pub use encoder::{encode_target, indicator_name, ColumnEncoding, FeatureEncoder};

use crate::config::{AppConfig, FeatureConfig};
use crate::error::Result;
use polars::prelude::*;
use tracing::info;

/// Engineered table plus the encoder fitted on it
#[derive(Debug, Clone)]
pub struct EngineeredData {
    pub data: DataFrame,
    pub encoder: FeatureEncoder,
}

/// Feature engineering stage
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    target_column: String,
    id_columns: Vec<String>,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new("Churn")
    }
}

impl FeatureEngineer {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            id_columns: FeatureConfig::default().id_columns,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            target_column: config.data.target_column.clone(),
            id_columns: config.features.id_columns.clone(),
        }
    }

    pub fn with_id_columns(mut self, id_columns: Vec<String>) -> Self {
        self.id_columns = id_columns;
        self
    }

    /// Fit a fresh encoder on `df` and return the encoded table with it
    pub fn fit_engineer(&self, df: &DataFrame) -> Result<EngineeredData> {
        info!(rows = df.height(), cols = df.width(), "Starting feature engineering");

        for id in &self.id_columns {
            if df.column(id).is_ok() {
                info!(column = %id, "Dropped identifier column");
            }
        }

        let mut encoder = FeatureEncoder::new(&self.target_column, self.id_columns.clone());
        let data = encoder.fit_transform(df)?;

        info!(features = encoder.feature_names().len(), "Feature engineering completed successfully");
        Ok(EngineeredData { data, encoder })
    }

    /// Encode `df`; the fitted vocabulary is discarded
    pub fn engineer(&self, df: &DataFrame) -> Result<DataFrame> {
        Ok(self.fit_engineer(df)?.data)
    }
}

/// Engineer `df` with the default identifier list
pub fn engineer(df: &DataFrame, target_column: &str) -> Result<DataFrame> {
    FeatureEngineer::new(target_column).engineer(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_names;

    #[test]
    fn test_engineer_drops_id_and_maps_target() {
        let df = df!(
            "customerID" => &["1", "2", "3"],
            "tenure" => &[10.0, 7.5, 5.0],
            "Churn" => &["Yes", "No", "Yes"]
        )
        .unwrap();

        let out = engineer(&df, "Churn").unwrap();
        assert!(!column_names(&out).contains(&"customerID".to_string()));
        let churn: Vec<Option<i32>> = out.column("Churn").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(churn, vec![Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn test_single_category_column_removed() {
        let df = df!(
            "PhoneService" => &["Yes", "Yes"],
            "Churn" => &["No", "Yes"]
        )
        .unwrap();

        let out = engineer(&df, "Churn").unwrap();
        assert_eq!(column_names(&out), vec!["Churn"]);
    }

    #[test]
    fn test_custom_id_columns() {
        let df = df!(
            "RowNumber" => &[1i64, 2],
            "Churn" => &["No", "Yes"]
        )
        .unwrap();

        let out = FeatureEngineer::new("Churn")
            .with_id_columns(vec!["RowNumber".into()])
            .engineer(&df)
            .unwrap();
        assert_eq!(out.width(), 1);
    }
}
