//! Churn pipeline - customer churn prediction from tabular exports
//!
//! A linear batch pipeline: load a CSV, validate it against the expected
//! schema, clean it, encode features and train a logistic regression with
//! SMOTE rebalancing and tracked runs.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`utils`] - CSV loading and table helpers
//! - [`validation`] - Schema gate and data-quality report
//! - [`preprocessing`] - Deduplication, imputation, scaling, profiling
//! - [`feature_engineering`] - Identifier removal and categorical encoding
//! - [`synthetic`] - Minority oversampling (SMOTE)
//! - [`training`] - Stratified split, logistic regression, evaluation
//! - [`pipeline`] - Orchestrator running the stages in order
//!
//! ## Infrastructure
//! - [`config`] - YAML configuration
//! - [`logging`] - Log sink installation
//! - [`tracking`] - Experiment tracking
//! - [`export`] - Artifact serialization
//! - [`inference`] - Scoring with persisted artifacts
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;
pub mod logging;

// Pipeline stages
pub mod utils;
pub mod validation;
pub mod preprocessing;
pub mod feature_engineering;
pub mod synthetic;
pub mod training;
pub mod pipeline;

// Infrastructure
pub mod tracking;
pub mod export;
pub mod inference;

// Services
pub mod cli;

pub use error::{ChurnError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChurnError, Result};

    // Configuration
    pub use crate::config::AppConfig;

    // Validation
    pub use crate::validation::{DataValidator, ExpectedSchema, SemanticType, ValidationReport};

    // Preprocessing
    pub use crate::preprocessing::{DataPreprocessor, FeatureScaler, ScalerType};

    // Feature engineering
    pub use crate::feature_engineering::{FeatureEncoder, FeatureEngineer};

    // Synthetic data
    pub use crate::synthetic::{Sampler, SamplingStrategy, SMOTE};

    // Training
    pub use crate::training::{LogisticRegression, Solver, Trainer, TrainingConfig, TrainingOutcome};

    // Pipeline
    pub use crate::pipeline::{ChurnPipeline, PipelineReport};

    // Inference
    pub use crate::inference::ChurnPredictor;

    // Experiment tracking
    pub use crate::tracking::{ExperimentTracker, RunRecord};

    // Export
    pub use crate::export::{ArtifactPaths, ArtifactSet};
}
