//! Pipeline orchestrator
//!
//! One fixed path: load, validate, preprocess, validate again, engineer
//! features, train. Every stage runs inside a `stage` span so log lines carry
//! the stage name. There is no retry and no partial resume.

use crate::config::AppConfig;
use crate::error::{ChurnError, Result};
use crate::feature_engineering::FeatureEngineer;
use crate::preprocessing::DataPreprocessor;
use crate::training::{Trainer, TrainingConfig, TrainingOutcome};
use crate::utils::DataLoader;
use crate::validation::{DataValidator, ExpectedSchema, ValidationOutcome, ValidationReport};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Report on the raw table
    pub initial_report: ValidationReport,
    /// Report on the cleaned table
    pub post_clean_report: ValidationReport,
    pub rows_loaded: usize,
    pub rows_after_cleaning: usize,
    pub outcome: TrainingOutcome,
    pub elapsed_secs: f64,
}

/// Runs `name` inside a `stage` span and logs a failure at error level
fn stage<T>(name: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let span = info_span!("stage", name);
    span.in_scope(|| {
        let result = f();
        if let Err(e) = &result {
            error!(error = %e, "Stage failed");
        }
        result
    })
}

/// Composes the stages with one configuration
#[derive(Debug, Clone)]
pub struct ChurnPipeline {
    config: AppConfig,
}

impl ChurnPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn validator(&self) -> DataValidator {
        DataValidator::new(ExpectedSchema::churn_with_target(&self.config.data.target_column))
            .with_min_rows(self.config.validation.min_rows)
    }

    /// Load and validate `path` without cleaning or training
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<ValidationOutcome> {
        let df = stage("load", || DataLoader::new().load_csv(path.as_ref()))?;
        stage("validate", || self.validator().validate(&df))
    }

    /// Run the whole pipeline on the CSV at `path`
    pub fn run(&self, path: impl AsRef<Path>) -> Result<PipelineReport> {
        let path = path.as_ref();
        info!(path = %path.display(), "Starting churn pipeline");
        let df = stage("load", || DataLoader::new().load_csv(path))?;
        self.run_frame(&df)
    }

    /// Run every stage after loading on an in-memory table
    pub fn run_frame(&self, df: &DataFrame) -> Result<PipelineReport> {
        let start = Instant::now();
        let validator = self.validator();

        let initial = stage("validate", || validator.validate(df))?;

        let cleaned = stage("preprocess", || {
            DataPreprocessor::from_config(&self.config.preprocessing).preprocess(&initial.data)
        })?;

        let post_clean = stage("post_clean_validate", || validator.validate(&cleaned))?;
        if post_clean.report.has_warnings() {
            if self.config.validation.fail_on_post_clean_warnings {
                return Err(ChurnError::ValidationError(format!(
                    "Post-cleaning validation has warnings: {}",
                    post_clean.report.warnings.join("; ")
                )));
            }
            warn!(
                warnings = post_clean.report.warnings.len(),
                "Post-cleaning validation has warnings; continuing"
            );
        }

        let engineered = stage("feature_engineering", || {
            FeatureEngineer::from_config(&self.config).fit_engineer(&cleaned)
        })?;

        let trainer = Trainer::new(TrainingConfig::from(&self.config));
        let outcome = stage("train", || trainer.train(&engineered.data, Some(&engineered.encoder)))?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            roc_auc = outcome.metrics.roc_auc,
            run_id = %outcome.training_run_id,
            seconds = elapsed_secs,
            "Churn pipeline completed"
        );

        Ok(PipelineReport {
            initial_report: initial.report,
            post_clean_report: post_clean.report,
            rows_loaded: df.height(),
            rows_after_cleaning: cleaned.height(),
            outcome,
            elapsed_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_missing_target() -> DataFrame {
        df!(
            "tenure" => &[1.0, 2.0],
            "MonthlyCharges" => &[10.0, 20.0],
            "TotalCharges" => &[10.0, 40.0],
            "SeniorCitizen" => &[0i64, 1]
        )
        .unwrap()
    }

    #[test]
    fn test_missing_column_aborts_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ChurnPipeline::new(AppConfig::default().with_output_root(dir.path()));
        let err = pipeline.run_frame(&frame_missing_target()).unwrap_err();
        assert!(matches!(err, ChurnError::MissingColumns(ref cols) if cols == &["Churn".to_string()]));
        assert!(!dir.path().join("models").exists());
    }

    /// 61 rows with one null `SeniorCitizen` whose 0/1 median is 0.5
    fn frame_with_fractional_median() -> DataFrame {
        let n = 61;
        let tenure: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        let monthly: Vec<f64> = (0..n).map(|i| 20.0 + (i * 7 % 80) as f64).collect();
        let total: Vec<f64> = tenure.iter().zip(&monthly).map(|(t, m)| t * m).collect();
        let senior: Vec<Option<i64>> = (0..n)
            .map(|i| match i {
                60 => None,
                i if i < 30 => Some(0),
                _ => Some(1),
            })
            .collect();
        let churn: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "Yes" } else { "No" }).collect();
        df!(
            "tenure" => tenure,
            "MonthlyCharges" => monthly,
            "TotalCharges" => total,
            "SeniorCitizen" => senior,
            "Churn" => churn
        )
        .unwrap()
    }

    #[test]
    fn test_fractional_median_fill_reaches_training() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ChurnPipeline::new(AppConfig::default().with_output_root(dir.path()));
        let report = pipeline.run_frame(&frame_with_fractional_median()).unwrap();

        assert_eq!(report.rows_after_cleaning, 61);
        assert!(report.outcome.feature_names.contains(&"SeniorCitizen".to_string()));
        assert_eq!(report.outcome.n_train + report.outcome.n_test, 61);
    }

    #[test]
    fn test_renamed_target_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = frame_with_fractional_median();
        df.rename("Churn", "Exited".into()).unwrap();

        let config = AppConfig::default()
            .with_output_root(dir.path())
            .with_target_column("Exited");
        let report = ChurnPipeline::new(config).run_frame(&df).unwrap();
        assert!(!report.outcome.feature_names.contains(&"Exited".to_string()));

        let err = ChurnPipeline::new(AppConfig::default().with_output_root(dir.path()))
            .run_frame(&df)
            .unwrap_err();
        assert!(matches!(err, ChurnError::MissingColumns(ref cols) if cols == &["Churn".to_string()]));
    }

    #[test]
    fn test_missing_file() {
        let pipeline = ChurnPipeline::new(AppConfig::default());
        assert!(pipeline.run("/nonexistent/churn.csv").is_err());
    }
}
