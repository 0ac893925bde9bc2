//! Inference module
//!
//! Scores new customer tables with the model, scaler and encoder persisted by
//! one training run:
//! - Artifact pairing check on load
//! - The cleaning and encoding replayed without dropping rows
//! - Configurable classification threshold

mod predictor;

pub use predictor::{ChurnPredictor, PredictionSummary, PREDICTION_COLUMN, PROBABILITY_COLUMN};
