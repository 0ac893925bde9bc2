//! Churn pipeline - Main Entry Point

use clap::Parser;
use churn_pipeline::cli::{cmd_init, cmd_predict, cmd_profile, cmd_run, cmd_validate, Cli, Commands};
use churn_pipeline::config::AppConfig;
use churn_pipeline::logging::init_logging;
use std::path::Path;

/// Load the configuration document and install the file logger it names
fn configured(path: &Path) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load(path)?;
    let log_path = init_logging(&config.logging)?;
    tracing::debug!(log = %log_path.display(), config = %path.display(), "Logging initialized");
    Ok(config)
}

/// Stderr-only logging for commands that run without a configuration
fn stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_pipeline=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { data } => {
            cmd_run(configured(&cli.config)?, data.as_deref())?;
        }
        Commands::Validate { data } => {
            cmd_validate(configured(&cli.config)?, data.as_deref())?;
        }
        Commands::Predict { data, output, threshold } => {
            cmd_predict(configured(&cli.config)?, &data, output.as_deref(), threshold)?;
        }
        Commands::Profile { data, format, top_k } => {
            stderr_logging();
            cmd_profile(&data, format, top_k)?;
        }
        Commands::Init { dir } => {
            stderr_logging();
            cmd_init(&dir)?;
        }
    }

    Ok(())
}
