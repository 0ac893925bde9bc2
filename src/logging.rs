//! Log sink installation
//!
//! Components never own a logger. They emit `tracing` events, and the module
//! path of the emitting code becomes the component name in every line. The
//! binary installs the subscriber once; tests either install a scoped one with
//! `tracing::subscriber::with_default` or run without any.

use crate::config::LoggingConfig;
use crate::error::{ChurnError, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber: stderr plus an append-only log file.
///
/// Each file line reads `timestamp LEVEL span: component: message fields`.
/// `RUST_LOG` overrides `config.level`. Returns the log file path.
pub fn init_logging(config: &LoggingConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.dir)?;
    let path = config.dir.join(&config.file);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ChurnError::ConfigError(format!("Invalid log level '{}': {}", config.level, e)))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ChurnError::ConfigError(format!("Failed to install log subscriber: {}", e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            dir: dir.path().join("logs"),
            file: "project.log".to_string(),
            level: "info".to_string(),
        };

        let path = init_logging(&config).unwrap();
        tracing::info!(component = "test", "log line");

        assert!(path.exists());
        assert_eq!(path, dir.path().join("logs").join("project.log"));
    }
}
