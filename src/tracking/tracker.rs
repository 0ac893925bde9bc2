//! Experiment tracker
//!
//! Records parameters, metrics, tags and artifacts of a training run and
//! persists them as one immutable record when the run ends.

use super::storage::{LocalStorage, TrackingStore};
use crate::error::{ChurnError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is currently running
    Running,
    /// Run completed successfully
    Finished,
    /// Run failed
    Failed,
}

/// One tracked training invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub params: BTreeMap<String, String>,
    /// Latest value of each metric
    pub metrics: BTreeMap<String, f64>,
    pub tags: BTreeMap<String, String>,
    /// Stored artifact paths
    pub artifacts: Vec<String>,
    pub status: RunStatus,
}

impl RunRecord {
    fn new(experiment_name: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            experiment_name: experiment_name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Get run duration in seconds
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Experiment tracker bound to one store and experiment
pub struct ExperimentTracker {
    store: Box<dyn TrackingStore>,
    experiment_name: String,
    current: Option<RunRecord>,
}

impl ExperimentTracker {
    pub fn new(store: Box<dyn TrackingStore>, experiment_name: impl Into<String>) -> Self {
        Self {
            store,
            experiment_name: experiment_name.into(),
            current: None,
        }
    }

    /// Tracker over the store named by `tracking_uri`
    pub fn from_uri(tracking_uri: &str, experiment_name: impl Into<String>) -> Result<Self> {
        let store = LocalStorage::from_uri(tracking_uri)?;
        Ok(Self::new(Box::new(store), experiment_name))
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Start a new run and return its id
    pub fn start_run(&mut self) -> Result<String> {
        if let Some(run) = &self.current {
            return Err(ChurnError::TrackingError(format!(
                "Run {} is still active",
                run.run_id
            )));
        }
        let record = RunRecord::new(&self.experiment_name);
        self.store.create_run(&self.experiment_name, &record.run_id)?;
        info!(run_id = %record.run_id, experiment = %self.experiment_name, "Tracking run started");
        let run_id = record.run_id.clone();
        self.current = Some(record);
        Ok(run_id)
    }

    fn active(&mut self) -> Result<&mut RunRecord> {
        self.current
            .as_mut()
            .ok_or_else(|| ChurnError::TrackingError("No active run".to_string()))
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.active()?.params.insert(key.into(), value.into());
        Ok(())
    }

    pub fn log_params(&mut self, params: BTreeMap<String, String>) -> Result<()> {
        self.active()?.params.extend(params);
        Ok(())
    }

    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) -> Result<()> {
        self.active()?.metrics.insert(name.into(), value);
        Ok(())
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.active()?.tags.insert(key.into(), value.into());
        Ok(())
    }

    /// Copy a file into the active run
    pub fn log_artifact(&mut self, path: &Path) -> Result<()> {
        let record = self.current.as_ref().ok_or_else(|| {
            ChurnError::TrackingError("No active run".to_string())
        })?;
        let stored = self.store.store_artifact(record, path)?;
        self.active()?.artifacts.push(stored.display().to_string());
        Ok(())
    }

    /// Close the active run and persist its record
    pub fn end_run(&mut self, status: RunStatus) -> Result<RunRecord> {
        let mut record = self
            .current
            .take()
            .ok_or_else(|| ChurnError::TrackingError("No active run".to_string()))?;
        record.status = status;
        record.end_time = Some(Utc::now());
        self.store.write_run(&record)?;
        info!(
            run_id = %record.run_id,
            status = ?status,
            seconds = record.duration_secs(),
            "Tracking run recorded"
        );
        Ok(record)
    }

    /// Finished runs of this experiment, oldest first
    pub fn list_runs(&self) -> Result<Vec<RunRecord>> {
        self.store.load_runs(&self.experiment_name)
    }
}
