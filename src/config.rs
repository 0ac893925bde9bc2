//! Pipeline configuration
//!
//! The configuration document is YAML with one group per pipeline concern:
//! `data`, `validation`, `preprocessing`, `features`, `smote`, `scaler`,
//! `model`, `paths`, `mlflow` and `logging`. Every group has defaults, so a
//! document only needs to name what it overrides, but the file itself must
//! exist.

use crate::error::{ChurnError, Result};
use crate::preprocessing::ScalerType;
use crate::synthetic::SamplingStrategy;
use crate::training::Solver;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration document
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Input data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Raw CSV consumed by `churn run` when no path is given
    pub raw_path: PathBuf,
    /// Name of the binary target column
    pub target_column: String,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the train/test split
    pub random_state: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("data/raw/WA_Fn-UseC_-Telco-Customer-Churn.csv"),
            target_column: "Churn".to_string(),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Validation gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Row count below which a warning is recorded
    pub min_rows: usize,
    /// Abort before training when the post-cleaning report carries warnings
    pub fail_on_post_clean_warnings: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_rows: 50,
            fail_on_post_clean_warnings: false,
        }
    }
}

/// Cleaning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Replacement for missing text values
    pub text_fill_value: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            text_fill_value: "Unknown".to_string(),
        }
    }
}

/// Feature engineering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Identifier columns dropped before encoding
    pub id_columns: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            id_columns: vec!["customerID".to_string()],
        }
    }
}

/// Minority oversampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoteConfig {
    pub random_state: u64,
    pub sampling_strategy: SamplingStrategy,
    pub k_neighbors: usize,
}

impl Default for SmoteConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            sampling_strategy: SamplingStrategy::default(),
            k_neighbors: 5,
        }
    }
}

/// Feature scaler settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    #[serde(rename = "type")]
    pub scaler_type: ScalerType,
}

/// Classifier hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub max_iter: usize,
    /// Inverse regularization strength
    #[serde(rename = "C")]
    pub c: f64,
    pub solver: Solver,
    /// Convergence tolerance on the gradient
    pub tol: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            c: 1.0,
            solver: Solver::Lbfgs,
            tol: 1e-4,
        }
    }
}

/// Artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub model_dir: PathBuf,
    pub model_name: String,
    pub scaler_name: String,
    pub encoder_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model_name: "model.bin".to_string(),
            scaler_name: "scaler.bin".to_string(),
            encoder_name: "encoder.bin".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_name)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.model_dir.join(&self.encoder_name)
    }
}

/// Experiment tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// `file:` URI or plain directory of the run store
    pub tracking_uri: String,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_uri: "file:./mlruns".to_string(),
            experiment_name: "churn_prediction".to_string(),
        }
    }
}

/// Log sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file: String,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: "project.log".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Complete configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub validation: ValidationConfig,
    pub preprocessing: PreprocessConfig,
    pub features: FeatureConfig,
    pub smote: SmoteConfig,
    pub scaler: ScalerConfig,
    pub model: ModelConfig,
    pub paths: PathsConfig,
    pub mlflow: TrackingConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate the configuration document at `path`.
    ///
    /// A missing file is a configuration error rather than a silent fallback
    /// to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::ConfigError(format!(
                "Config file not found at {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&contents)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Defaults rendered as a starter `config.yaml`
    pub fn default_yaml() -> Result<String> {
        Self::default().to_yaml()
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let test_size = self.data.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(invalid("data.test_size", test_size, "must be in (0, 1)"));
        }
        if self.data.target_column.is_empty() {
            return Err(invalid("data.target_column", "\"\"", "must not be empty"));
        }
        if self.model.c <= 0.0 || !self.model.c.is_finite() {
            return Err(invalid("model.C", self.model.c, "must be a positive number"));
        }
        if self.model.max_iter == 0 {
            return Err(invalid("model.max_iter", 0, "must be at least 1"));
        }
        if self.model.tol <= 0.0 {
            return Err(invalid("model.tol", self.model.tol, "must be positive"));
        }
        if let SamplingStrategy::Ratio(ratio) = self.smote.sampling_strategy {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(invalid("smote.sampling_strategy", ratio, "ratio must be in (0, 1]"));
            }
        }
        if self.smote.k_neighbors == 0 {
            return Err(invalid("smote.k_neighbors", 0, "must be at least 1"));
        }
        for (name, value) in [
            ("paths.model_name", &self.paths.model_name),
            ("paths.scaler_name", &self.paths.scaler_name),
            ("paths.encoder_name", &self.paths.encoder_name),
            ("mlflow.experiment_name", &self.mlflow.experiment_name),
        ] {
            if value.is_empty() {
                return Err(invalid(name, "\"\"", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Builder method to override the target column
    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.data.target_column = target.into();
        self
    }

    /// Builder method to redirect every output (artifacts, runs, logs) under `root`
    pub fn with_output_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.paths.model_dir = root.join("models");
        self.mlflow.tracking_uri = format!("file:{}", root.join("mlruns").display());
        self.logging.dir = root.join("logs");
        self
    }
}

fn invalid(name: &str, value: impl std::fmt::Display, reason: &str) -> ChurnError {
    ChurnError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.target_column, "Churn");
        assert_eq!(config.validation.min_rows, 50);
        assert_eq!(config.paths.model_path(), PathBuf::from("models/model.bin"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
data:
  target_column: Churn
  test_size: 0.25
  random_state: 7
smote:
  sampling_strategy: 0.8
scaler:
  type: minmax
model:
  C: 0.5
  solver: liblinear
  max_iter: 200
mlflow:
  tracking_uri: file:./runs
  experiment_name: churn
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.data.test_size, 0.25);
        assert_eq!(config.data.random_state, 7);
        assert_eq!(config.smote.sampling_strategy, SamplingStrategy::Ratio(0.8));
        assert_eq!(config.scaler.scaler_type, ScalerType::MinMax);
        assert_eq!(config.model.c, 0.5);
        assert_eq!(config.model.solver, Solver::Liblinear);
        assert_eq!(config.paths.model_name, "model.bin");
        assert_eq!(config.mlflow.experiment_name, "churn");
    }

    #[test]
    fn test_unknown_solver_rejected() {
        let yaml = "model:\n  solver: adam\n";
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ChurnError::ConfigError(_)));
    }

    #[test]
    fn test_out_of_range_test_size_rejected() {
        let yaml = "data:\n  test_size: 1.5\n";
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ChurnError::InvalidParameter { .. }));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AppConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ChurnError::ConfigError(_)));
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "data:\n  target_column: Exited").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.data.target_column, "Exited");
    }

    #[test]
    fn test_default_yaml_round_trips() {
        let yaml = AppConfig::default_yaml().unwrap();
        let parsed = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.model.solver, Solver::Lbfgs);
        assert_eq!(parsed.smote.sampling_strategy, SamplingStrategy::Auto);
    }
}
