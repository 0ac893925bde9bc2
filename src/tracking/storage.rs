//! Storage backend for run records
//!
//! Layout under the store root:
//! `<experiment>/<run_id>/run.json` plus `<experiment>/<run_id>/artifacts/`.
//! Run directories and records are created exclusively and never rewritten.

use super::tracker::RunRecord;
use crate::error::{ChurnError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage backend trait
pub trait TrackingStore {
    /// Reserve the directory of a new run
    fn create_run(&self, experiment: &str, run_id: &str) -> Result<PathBuf>;

    /// Persist a finished run record
    fn write_run(&self, record: &RunRecord) -> Result<()>;

    /// Copy `source` into the run's artifact area, returning the stored path
    fn store_artifact(&self, record: &RunRecord, source: &Path) -> Result<PathBuf>;

    /// Load every finished run of an experiment, oldest first
    fn load_runs(&self, experiment: &str) -> Result<Vec<RunRecord>>;
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a tracking URI. `file:` URIs and bare paths are supported;
    /// any other scheme is a tracking error.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(Self::new(rest));
        }
        if let Some(rest) = uri.strip_prefix("file:") {
            return Ok(Self::new(rest));
        }
        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(ChurnError::TrackingError(format!(
                "Unsupported tracking URI scheme '{}': only file stores are available",
                scheme
            )));
        }
        if uri.is_empty() {
            return Err(ChurnError::TrackingError("Empty tracking URI".to_string()));
        }
        Ok(Self::new(uri))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_dir(&self, experiment: &str, run_id: &str) -> PathBuf {
        self.base_dir.join(experiment).join(run_id)
    }
}

fn tracking_io(context: &str, path: &Path, e: std::io::Error) -> ChurnError {
    ChurnError::TrackingError(format!("{} {}: {}", context, path.display(), e))
}

impl TrackingStore for LocalStorage {
    fn create_run(&self, experiment: &str, run_id: &str) -> Result<PathBuf> {
        let experiment_dir = self.base_dir.join(experiment);
        fs::create_dir_all(&experiment_dir)
            .map_err(|e| tracking_io("Failed to create", &experiment_dir, e))?;

        let run_dir = self.run_dir(experiment, run_id);
        fs::create_dir(&run_dir).map_err(|e| tracking_io("Failed to create", &run_dir, e))?;
        Ok(run_dir)
    }

    fn write_run(&self, record: &RunRecord) -> Result<()> {
        let path = self
            .run_dir(&record.experiment_name, &record.run_id)
            .join("run.json");
        let json = serde_json::to_string_pretty(record)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| tracking_io("Failed to create", &path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| tracking_io("Failed to write", &path, e))?;
        Ok(())
    }

    fn store_artifact(&self, record: &RunRecord, source: &Path) -> Result<PathBuf> {
        let artifact_dir = self
            .run_dir(&record.experiment_name, &record.run_id)
            .join("artifacts");
        fs::create_dir_all(&artifact_dir)
            .map_err(|e| tracking_io("Failed to create", &artifact_dir, e))?;

        let name = source.file_name().ok_or_else(|| {
            ChurnError::TrackingError(format!("Artifact path has no file name: {}", source.display()))
        })?;
        let target = artifact_dir.join(name);
        if target.exists() {
            return Err(ChurnError::TrackingError(format!(
                "Artifact already recorded: {}",
                target.display()
            )));
        }
        fs::copy(source, &target).map_err(|e| tracking_io("Failed to copy", source, e))?;
        Ok(target)
    }

    fn load_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let experiment_dir = self.base_dir.join(experiment);
        if !experiment_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        let entries = fs::read_dir(&experiment_dir)
            .map_err(|e| tracking_io("Failed to read", &experiment_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| tracking_io("Failed to read", &experiment_dir, e))?;
            let path = entry.path().join("run.json");
            if !path.is_file() {
                continue;
            }
            let contents =
                fs::read_to_string(&path).map_err(|e| tracking_io("Failed to read", &path, e))?;
            runs.push(serde_json::from_str::<RunRecord>(&contents)?);
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(runs)
    }
}
