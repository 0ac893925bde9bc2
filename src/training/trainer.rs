//! Training stage
//!
//! Fixed sequence: split predictors and target, stratified train/test split,
//! scaler fitted on the training rows, SMOTE on the scaled training rows,
//! logistic regression, evaluation on the untouched test rows, run tracking
//! and artifact persistence.

use super::config::TrainingConfig;
use super::linear_models::LogisticRegression;
use super::metrics::{roc_auc_score, ClassificationReport};
use super::split::stratified_split;
use crate::error::{ChurnError, Result};
use crate::export::{save_artifact, ArtifactHeader, ArtifactKind, ArtifactPaths, ArtifactSet};
use crate::feature_engineering::FeatureEncoder;
use crate::preprocessing::FeatureScaler;
use crate::synthetic::{Sampler, SMOTE};
use crate::tracking::{ExperimentTracker, RunRecord, RunStatus};
use crate::utils::{column_names, is_numeric};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Test-partition scores of a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub roc_auc: f64,
    pub accuracy: f64,
    /// F1 of the positive class
    pub f1: f64,
    pub report: ClassificationReport,
}

impl EvaluationMetrics {
    /// Score `model` on already-scaled rows
    pub fn evaluate(model: &LogisticRegression, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let y_pred = model.predict(x)?;
        let y_proba = model.predict_proba(x)?;

        let roc_auc = roc_auc_score(y, &y_proba)?;
        let report = ClassificationReport::binary(y, &y_pred)?;
        let f1 = report.positive().map(|c| c.f1).unwrap_or(0.0);

        Ok(Self {
            roc_auc,
            accuracy: report.accuracy,
            f1,
            report,
        })
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("roc_auc".to_string(), self.roc_auc);
        metrics.insert("accuracy".to_string(), self.accuracy);
        metrics.insert("f1".to_string(), self.f1);
        metrics
    }
}

/// Everything one training invocation produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: LogisticRegression,
    pub scaler: FeatureScaler,
    pub metrics: EvaluationMetrics,
    /// Id stamped on every persisted artifact
    pub training_run_id: String,
    /// Predictor names in model column order
    pub feature_names: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    /// Training rows after oversampling
    pub n_resampled: usize,
    /// Tracked run, `None` when tracking failed
    pub run: Option<RunRecord>,
    pub training_time_secs: f64,
}

/// Split `df` into predictor names, predictor matrix and 0/1 target
pub fn prepare_training_data(df: &DataFrame, target: &str) -> Result<(Vec<String>, Array2<f64>, Array1<f64>)> {
    let target_series = df
        .column(target)
        .map_err(|_| ChurnError::FeatureNotFound(target.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let target_ca = target_series.f64()?;

    if target_ca.null_count() > 0 {
        return Err(ChurnError::TrainingError(format!(
            "Target column '{}' has {} missing values",
            target,
            target_ca.null_count()
        )));
    }
    let y: Array1<f64> = target_ca.into_no_null_iter().collect();
    if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
        return Err(ChurnError::TrainingError(format!(
            "Target column '{}' must be 0/1, found {}",
            target, bad
        )));
    }

    let features: Vec<String> = column_names(df).into_iter().filter(|c| c != target).collect();
    if features.is_empty() {
        return Err(ChurnError::FeatureError("No predictor columns left for training".to_string()));
    }
    for name in &features {
        let dtype = df.column(name)?.dtype();
        if !(is_numeric(dtype) || dtype == &DataType::Boolean) {
            return Err(ChurnError::FeatureError(format!(
                "Column '{}' has non-numeric dtype {}; encode it before training",
                name, dtype
            )));
        }
    }

    let x = columns_to_array2(df, &features)?;
    Ok((features, x, y))
}

/// Extract named columns into a row-major matrix. Nulls are rejected.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.clone()))?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let ca = series.f64()?;
            if ca.null_count() > 0 {
                return Err(ChurnError::FeatureError(format!(
                    "Column '{}' has {} missing values",
                    col_name,
                    ca.null_count()
                )));
            }
            Ok(ca.into_no_null_iter().collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Runs the training stage
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on the engineered table `df`.
    ///
    /// `encoder` is persisted next to the model when given. Tracking failures
    /// are logged and skipped; artifact write failures abort.
    pub fn train(&self, df: &DataFrame, encoder: Option<&FeatureEncoder>) -> Result<TrainingOutcome> {
        let cfg = &self.config;
        let start = Instant::now();
        info!(target_column = %cfg.target_column, rows = df.height(), cols = df.width(), "Starting model training");

        let (feature_names, x, y) = prepare_training_data(df, &cfg.target_column)?;

        let labels: Array1<i64> = y.mapv(|v| v as i64);
        let split = stratified_split(&labels, cfg.test_size, cfg.random_state)?;
        let x_train = x.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.test);
        let y_train = labels.select(Axis(0), &split.train);
        let y_test = y.select(Axis(0), &split.test);
        info!(train = split.train.len(), test = split.test.len(), "Train-test split completed");

        let mut scaler = FeatureScaler::new(cfg.scaler_type);
        let x_train_scaled = scaler.fit_transform(&x_train)?;
        let x_test_scaled = scaler.transform(&x_test)?;
        info!(scaler = %String::from(cfg.scaler_type), "Scaler fitted on training partition");

        let mut smote = SMOTE::new()
            .with_k_neighbors(cfg.k_neighbors)
            .with_sampling_strategy(cfg.sampling_strategy)
            .with_seed(cfg.smote_random_state);
        let resampled = smote.fit_resample(&x_train_scaled, &y_train)?;

        let mut model = LogisticRegression::new()
            .with_c(cfg.c)
            .with_solver(cfg.solver)
            .with_max_iter(cfg.max_iter)
            .with_tol(cfg.tol);
        model.fit(&resampled.x, &resampled.y.mapv(|v| v as f64))?;
        info!(solver = %cfg.solver, n_iter = model.n_iter, "Model training completed");

        let metrics = EvaluationMetrics::evaluate(&model, &x_test_scaled, &y_test)?;
        info!("Classification Report:\n{}", metrics.report);
        info!(roc_auc = %format!("{:.4}", metrics.roc_auc), "ROC-AUC Score");

        let training_run_id = Uuid::new_v4().simple().to_string();
        let header = ArtifactHeader::new(
            ArtifactKind::Model,
            &training_run_id,
            feature_names.clone(),
            &cfg.target_column,
        );

        let run = match self.track(&model, &metrics, header.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Experiment tracking failed; continuing without a tracked run");
                None
            }
        };

        let artifacts = ArtifactSet {
            model: model.clone(),
            scaler: scaler.clone(),
            encoder: encoder.cloned(),
            training_run_id: training_run_id.clone(),
            feature_names: feature_names.clone(),
            target_name: cfg.target_column.clone(),
        };
        artifacts.save(&ArtifactPaths {
            model: cfg.model_path(),
            scaler: cfg.scaler_path(),
            encoder: cfg.encoder_path(),
        })?;
        info!(dir = %cfg.model_dir.display(), "Model and scaler saved successfully");

        let training_time_secs = start.elapsed().as_secs_f64();
        info!(seconds = training_time_secs, "Training pipeline finished successfully");

        Ok(TrainingOutcome {
            model,
            scaler,
            metrics,
            training_run_id,
            feature_names,
            n_train: split.train.len(),
            n_test: split.test.len(),
            n_resampled: resampled.y.len(),
            run,
            training_time_secs,
        })
    }

    /// Record params, metrics, tags and a model artifact as one run
    fn track(
        &self,
        model: &LogisticRegression,
        metrics: &EvaluationMetrics,
        header: ArtifactHeader,
    ) -> Result<RunRecord> {
        let cfg = &self.config;
        let mut tracker = ExperimentTracker::from_uri(&cfg.tracking_uri, &cfg.experiment_name)?;
        tracker.start_run()?;

        let logged = (|| -> Result<()> {
            tracker.log_params(cfg.run_params())?;
            for (name, value) in metrics.as_map() {
                tracker.log_metric(name, value)?;
            }
            tracker.set_tag("training_run_id", &header.training_run_id)?;
            tracker.set_tag("model_type", "LogisticRegression")?;
            tracker.set_tag("n_features", header.feature_names.len().to_string())?;

            let staging = tempfile::Builder::new().prefix("churn-run-").tempdir()?;
            let artifact = staging.path().join(&cfg.model_name);
            save_artifact(model, header.clone(), &artifact)?;
            tracker.log_artifact(&artifact)
        })();

        match logged {
            Ok(()) => tracker.end_run(RunStatus::Finished),
            Err(e) => {
                let _ = tracker.end_run(RunStatus::Failed);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_rejects_text_predictors() {
        let df = df!(
            "gender" => &["Male", "Female"],
            "Churn" => &[1i32, 0]
        )
        .unwrap();
        let err = prepare_training_data(&df, "Churn").unwrap_err();
        assert!(matches!(err, ChurnError::FeatureError(_)));
    }

    #[test]
    fn test_prepare_rejects_null_target() {
        let df = df!(
            "tenure" => &[1.0, 2.0],
            "Churn" => &[Some(1i32), None]
        )
        .unwrap();
        assert!(matches!(
            prepare_training_data(&df, "Churn"),
            Err(ChurnError::TrainingError(_))
        ));
    }

    #[test]
    fn test_prepare_accepts_booleans() {
        let df = df!(
            "flag" => &[true, false],
            "tenure" => &[1i64, 2],
            "Churn" => &[1i32, 0]
        )
        .unwrap();
        let (names, x, y) = prepare_training_data(&df, "Churn").unwrap();
        assert_eq!(names, vec!["flag", "tenure"]);
        assert_eq!(x[[0, 0]], 1.0);
        assert_eq!(x[[1, 1]], 2.0);
        assert_eq!(y.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_missing_target() {
        let df = df!("tenure" => &[1.0]).unwrap();
        assert!(matches!(
            prepare_training_data(&df, "Churn"),
            Err(ChurnError::FeatureNotFound(_))
        ));
    }
}
