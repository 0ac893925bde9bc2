//! Model training module
//!
//! Provides the churn training stage:
//! - Stratified train/test split
//! - Logistic regression with L2 penalty
//! - ROC-AUC and per-class classification report
//! - The [`Trainer`] tying scaling, oversampling, tracking and persistence together

mod config;
pub mod linear_models;
pub mod metrics;
pub mod split;
mod trainer;

pub use config::{Solver, TrainingConfig};
pub use linear_models::LogisticRegression;
pub use metrics::{confusion_counts, roc_auc_score, ClassMetrics, ClassificationReport};
pub use split::{stratified_split, TrainTestSplit};
pub use trainer::{
    columns_to_array2, prepare_training_data, EvaluationMetrics, Trainer, TrainingOutcome,
};
