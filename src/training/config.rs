//! Training configuration

use crate::config::AppConfig;
use crate::preprocessing::ScalerType;
use crate::synthetic::SamplingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Optimizer used to fit the logistic regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    #[serde(rename = "lbfgs")]
    Lbfgs,
    #[serde(rename = "liblinear")]
    Liblinear,
    #[serde(rename = "newton-cg")]
    NewtonCg,
    #[serde(rename = "newton-cholesky")]
    NewtonCholesky,
    #[serde(rename = "sag")]
    Sag,
    #[serde(rename = "saga")]
    Saga,
}

impl Solver {
    /// Whether the solver uses curvature information
    pub fn is_second_order(&self) -> bool {
        !matches!(self, Solver::Sag | Solver::Saga)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Solver::Lbfgs => "lbfgs",
            Solver::Liblinear => "liblinear",
            Solver::NewtonCg => "newton-cg",
            Solver::NewtonCholesky => "newton-cholesky",
            Solver::Sag => "sag",
            Solver::Saga => "saga",
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the trainer needs, flattened out of [`AppConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the stratified split
    pub random_state: u64,
    pub scaler_type: ScalerType,
    pub smote_random_state: u64,
    pub sampling_strategy: SamplingStrategy,
    pub k_neighbors: usize,
    /// Inverse regularization strength
    pub c: f64,
    pub solver: Solver,
    pub max_iter: usize,
    pub tol: f64,
    /// Directory receiving model, scaler and encoder artifacts
    pub model_dir: PathBuf,
    pub model_name: String,
    pub scaler_name: String,
    pub encoder_name: String,
    pub tracking_uri: String,
    pub experiment_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for TrainingConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            target_column: config.data.target_column.clone(),
            test_size: config.data.test_size,
            random_state: config.data.random_state,
            scaler_type: config.scaler.scaler_type,
            smote_random_state: config.smote.random_state,
            sampling_strategy: config.smote.sampling_strategy,
            k_neighbors: config.smote.k_neighbors,
            c: config.model.c,
            solver: config.model.solver,
            max_iter: config.model.max_iter,
            tol: config.model.tol,
            model_dir: config.paths.model_dir.clone(),
            model_name: config.paths.model_name.clone(),
            scaler_name: config.paths.scaler_name.clone(),
            encoder_name: config.paths.encoder_name.clone(),
            tracking_uri: config.mlflow.tracking_uri.clone(),
            experiment_name: config.mlflow.experiment_name.clone(),
        }
    }
}

impl TrainingConfig {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_name)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.model_dir.join(&self.encoder_name)
    }

    /// Builder method to redirect artifacts
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Builder method to change the tracking store
    pub fn with_tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Parameters recorded with every tracked run
    pub fn run_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("max_iter".to_string(), self.max_iter.to_string());
        params.insert("C".to_string(), self.c.to_string());
        params.insert("solver".to_string(), self.solver.to_string());
        params.insert("tol".to_string(), self.tol.to_string());
        params.insert("scaler_type".to_string(), String::from(self.scaler_type));
        params.insert(
            "smote_sampling_strategy".to_string(),
            self.sampling_strategy.to_string(),
        );
        params.insert("smote_k_neighbors".to_string(), self.k_neighbors.to_string());
        params.insert("test_size".to_string(), self.test_size.to_string());
        params.insert("random_state".to_string(), self.random_state.to_string());
        params
    }
}
