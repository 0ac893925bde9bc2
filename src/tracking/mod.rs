//! Experiment tracking module
//!
//! Append-only run records in a file store, in the spirit of MLflow's local
//! `mlruns` directory.

mod storage;
mod tracker;

pub use storage::{LocalStorage, TrackingStore};
pub use tracker::{ExperimentTracker, RunRecord, RunStatus};
