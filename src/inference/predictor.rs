//! Churn scoring with a persisted artifact set

use crate::error::{ChurnError, Result};
use crate::export::{ArtifactPaths, ArtifactSet};
use crate::preprocessing::{ImputeStrategy, Imputer};
use crate::training::columns_to_array2;
use crate::utils::{column_names, is_numeric, is_text};
use crate::validation::{coerce_column, ExpectedSchema, SemanticType};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Name of the probability column in scored output
pub const PROBABILITY_COLUMN: &str = "churn_probability";
/// Name of the 0/1 decision column in scored output
pub const PREDICTION_COLUMN: &str = "churn_prediction";

/// Aggregate view of one scored batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub rows: usize,
    pub predicted_churners: usize,
    pub mean_probability: f64,
    pub threshold: f64,
    pub latency_ms: f64,
}

/// Scores raw tables with a model, scaler and encoder from one training run
#[derive(Debug, Clone)]
pub struct ChurnPredictor {
    artifacts: ArtifactSet,
    schema: ExpectedSchema,
    id_columns: Vec<String>,
    text_fill_value: String,
    threshold: f64,
}

impl ChurnPredictor {
    pub fn new(artifacts: ArtifactSet) -> Self {
        let schema = ExpectedSchema::churn_with_target(&artifacts.target_name);
        Self {
            artifacts,
            schema,
            id_columns: vec!["customerID".to_string()],
            text_fill_value: "Unknown".to_string(),
            threshold: 0.5,
        }
    }

    /// Load the artifact set at `paths`; members from different runs are rejected
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let artifacts = ArtifactSet::load(paths)?;
        if artifacts.encoder.is_none() {
            warn!(path = %paths.encoder.display(), "No encoder artifact found; input must already be encoded");
        }
        info!(
            run_id = %artifacts.training_run_id,
            features = artifacts.feature_names.len(),
            "Loaded churn model"
        );
        Ok(Self::new(artifacts))
    }

    pub fn with_id_columns(mut self, id_columns: Vec<String>) -> Self {
        self.id_columns = id_columns;
        self
    }

    pub fn with_text_fill_value(mut self, value: impl Into<String>) -> Self {
        self.text_fill_value = value.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ChurnError::InvalidParameter {
                name: "threshold".to_string(),
                value: threshold.to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifacts.feature_names
    }

    /// Bring a raw table into model space: the fitted feature columns, in order
    pub fn prepare(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut data = df.clone();

        for (name, ty) in self.schema.columns() {
            if ty == SemanticType::Text {
                continue;
            }
            if let Ok(column) = data.column(name) {
                let coerced = coerce_column(column.as_materialized_series(), ty);
                if coerced.lost > 0 {
                    warn!(column = %name, count = coerced.lost, "Values could not be coerced");
                }
                data.with_column(coerced.series)?;
            }
        }

        // Rows are imputed but never dropped so output stays aligned with input
        let numeric = nullable_columns(&data, is_numeric);
        if !numeric.is_empty() {
            let cols: Vec<&str> = numeric.iter().map(String::as_str).collect();
            data = Imputer::new(ImputeStrategy::Median).fit_transform(&data, &cols)?;
        }
        let text = nullable_columns(&data, is_text);
        if !text.is_empty() {
            let cols: Vec<&str> = text.iter().map(String::as_str).collect();
            data = Imputer::new(ImputeStrategy::ConstantString(self.text_fill_value.clone()))
                .fit_transform(&data, &cols)?;
        }

        if let Some(encoder) = &self.artifacts.encoder {
            data = encoder.transform(&data)?;
        }

        let columns: Vec<Column> = self
            .artifacts
            .feature_names
            .iter()
            .map(|name| {
                data.column(name)
                    .cloned()
                    .map_err(|_| ChurnError::FeatureNotFound(name.clone()))
            })
            .collect::<Result<_>>()?;
        Ok(DataFrame::new(columns)?)
    }

    /// Churn probabilities for every row of `df`
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let features = self.prepare(df)?;
        let x = columns_to_array2(&features, &self.artifacts.feature_names)?;
        let x = self.artifacts.scaler.transform(&x)?;
        Ok(self.artifacts.model.predict_proba(&x)?.to_vec())
    }

    /// Score `df` and return the id column (when present) with probability
    /// and decision columns
    pub fn predict(&self, df: &DataFrame) -> Result<(DataFrame, PredictionSummary)> {
        let start = Instant::now();
        let probabilities = self.predict_proba(df)?;

        let decisions: Vec<i32> = probabilities
            .iter()
            .map(|p| i32::from(*p >= self.threshold))
            .collect();

        let mut columns: Vec<Column> = Vec::with_capacity(3);
        let present = column_names(df);
        if let Some(id) = self.id_columns.iter().find(|id| present.contains(id)) {
            columns.push(df.column(id)?.clone());
        }
        columns.push(Column::new(PROBABILITY_COLUMN.into(), &probabilities));
        columns.push(Column::new(PREDICTION_COLUMN.into(), &decisions));
        let scored = DataFrame::new(columns)?;

        let rows = probabilities.len();
        let summary = PredictionSummary {
            rows,
            predicted_churners: decisions.iter().filter(|d| **d == 1).count(),
            mean_probability: if rows == 0 {
                0.0
            } else {
                probabilities.iter().sum::<f64>() / rows as f64
            },
            threshold: self.threshold,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            rows = summary.rows,
            churners = summary.predicted_churners,
            latency_ms = summary.latency_ms,
            "Batch scored"
        );
        Ok((scored, summary))
    }
}

fn nullable_columns(df: &DataFrame, kind: fn(&DataType) -> bool) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| kind(col.dtype()) && col.null_count() > 0)
        .map(|col| col.name().to_string())
        .collect()
}
