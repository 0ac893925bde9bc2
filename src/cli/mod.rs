//! Churn pipeline CLI
//!
//! Command-line interface for training, validation, scoring, profiling and
//! project scaffolding.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::export::ArtifactPaths;
use crate::inference::ChurnPredictor;
use crate::pipeline::ChurnPipeline;
use crate::preprocessing::{profile, FeatureStats};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn_c(s: &str) -> ColoredString { s.truecolor(230, 190, 90) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_warn(msg: &str) {
    println!("  {} {}", warn_c("!"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn training pipeline")]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration document
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format of `churn profile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run load, validate, clean, engineer and train
    Run {
        /// Input CSV; defaults to `data.raw_path`
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Load and validate a CSV, then print the report
    Validate {
        /// Input CSV; defaults to `data.raw_path`
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Score a CSV with the persisted model
    Predict {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV; prints a preview when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Probability at or above which a customer is flagged
        #[arg(long, default_value = "0.5")]
        threshold: f64,
    },

    /// Print per-column statistics of a CSV
    Profile {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ProfileFormat,

        /// Categories listed per text column
        #[arg(long, default_value = "5")]
        top_k: usize,
    },

    /// Create the project layout and a default config
    Init {
        /// Project root
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(config: AppConfig, data: Option<&Path>) -> anyhow::Result<()> {
    let path = data.map(Path::to_path_buf).unwrap_or_else(|| config.data.raw_path.clone());
    section("Run");
    println!("  {:<14} {}", muted("Data"), path.display());
    println!("  {:<14} {}", muted("Target"), config.data.target_column);
    println!();

    let pipeline = ChurnPipeline::new(config);
    let report = pipeline.run(&path)?;
    let outcome = &report.outcome;

    for w in &report.post_clean_report.warnings {
        step_warn(w);
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Training complete".white().bold()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Rows loaded  ", &report.rows_loaded.to_string()));
    line_box(&kv("Rows cleaned ", &report.rows_after_cleaning.to_string()));
    line_box(&kv("Train / test ", &format!("{} / {}", outcome.n_train, outcome.n_test)));
    line_box(&kv("Resampled    ", &outcome.n_resampled.to_string()));
    line_box(&kv("Features     ", &outcome.feature_names.len().to_string()));
    line_box_empty();
    line_box(&kv("ROC-AUC      ", &format!("{:.4}", outcome.metrics.roc_auc)));
    line_box(&kv("Accuracy     ", &format!("{:.4}", outcome.metrics.accuracy)));
    line_box(&kv("F1 (churn)   ", &format!("{:.4}", outcome.metrics.f1)));
    line_box_empty();
    line_box(&kv("Run id       ", &outcome.training_run_id));
    line_box(&kv("Time         ", &format!("{:.2}s", report.elapsed_secs)));
    line_box_empty();
    line_box_bottom();
    println!();
    println!("{}", outcome.metrics.report);

    Ok(())
}

pub fn cmd_validate(config: AppConfig, data: Option<&Path>) -> anyhow::Result<()> {
    let path = data.map(Path::to_path_buf).unwrap_or_else(|| config.data.raw_path.clone());
    section("Validate");

    step_run("Validating");
    let start = Instant::now();
    let outcome = ChurnPipeline::new(config).validate_file(&path)?;
    step_done(&format!("{} rows × {} cols in {:?}", outcome.data.height(), outcome.data.width(), start.elapsed()));
    println!();

    let report = &outcome.report;
    if report.passed {
        step_ok("All checks passed");
    }
    for w in &report.warnings {
        step_warn(w);
    }
    println!();
    println!("  {}", dim(&report.summary()));
    println!();
    Ok(())
}

pub fn cmd_predict(
    config: AppConfig,
    data: &Path,
    output: Option<&Path>,
    threshold: f64,
) -> anyhow::Result<()> {
    section("Predict");

    let paths = ArtifactPaths {
        model: config.paths.model_path(),
        scaler: config.paths.scaler_path(),
        encoder: config.paths.encoder_path(),
    };

    step_run("Loading model");
    let predictor = ChurnPredictor::load(&paths)?
        .with_id_columns(config.features.id_columns.clone())
        .with_text_fill_value(config.preprocessing.text_fill_value.clone())
        .with_threshold(threshold)?;
    step_done(&format!("run {}", predictor.artifacts().training_run_id));

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Scoring");
    let (mut scored, summary) = predictor.predict(&df)?;
    step_done(&format!("{:.1} ms", summary.latency_ms));

    println!();
    println!("  {:<16} {}", muted("Rows"), summary.rows);
    println!("  {:<16} {}", muted("Flagged"), summary.predicted_churners.to_string().white().bold());
    println!("  {:<16} {:.4}", muted("Mean prob."), summary.mean_probability);
    println!();

    match output {
        Some(path) => {
            DataSaver::save_csv(&mut scored, path)?;
            step_ok(&format!("Predictions written to {}", path.display()));
            println!();
        }
        None => println!("{}", scored.head(Some(10))),
    }
    Ok(())
}

pub fn cmd_profile(data: &Path, format: ProfileFormat, top_k: usize) -> anyhow::Result<()> {
    let df = DataLoader::new().load_csv(data)?;
    let stats = profile(&df, top_k)?;

    if format == ProfileFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    section("Profile");
    println!("  {:<12} {}", muted("File"), data.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!(
        "  {:<18} {:<12} {:>6} {:>10} {:>10} {:>10} {:>10} {:>8}",
        muted("Column"), muted("Type"), muted("Nulls"), muted("Mean"), muted("Std"),
        muted("Min"), muted("Max"), muted("Unique")
    );
    println!("  {}", dim(&"─".repeat(92)));
    for s in &stats {
        print_stats_row(s);
    }
    println!();
    Ok(())
}

fn print_stats_row(s: &FeatureStats) {
    let num = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
    println!(
        "  {:<18} {:<12} {:>6} {:>10} {:>10} {:>10} {:>10} {:>8}",
        s.name,
        format!("{:?}", s.dtype).truecolor(140, 140, 140),
        s.null_count,
        num(s.mean),
        num(s.std),
        num(s.min),
        num(s.max),
        s.unique_count.map(|u| u.to_string()).unwrap_or_else(|| "-".to_string())
    );
    if let Some(top) = &s.top_categories {
        let cats: Vec<String> = top.iter().map(|(c, n)| format!("{} ({})", c, n)).collect();
        println!("  {:<18} {}", "", dim(&cats.join(", ")));
    }
}

/// Directories created by `churn init`, relative to the project root
pub const PROJECT_DIRS: [&str; 5] = ["config", "data/raw", "data/processed", "models", "logs"];

pub fn cmd_init(root: &Path) -> anyhow::Result<()> {
    section("Init");
    for dir in PROJECT_DIRS {
        std::fs::create_dir_all(root.join(dir))?;
        step_ok(&format!("{}/", root.join(dir).display()));
    }

    let config_path = root.join(DEFAULT_CONFIG_PATH);
    if config_path.exists() {
        step_warn(&format!("{} exists, left untouched", config_path.display()));
    } else {
        std::fs::write(&config_path, AppConfig::default_yaml()?)?;
        step_ok(&format!("{} written", config_path.display()));
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_does_not_overwrite_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(DEFAULT_CONFIG_PATH);
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, "data:\n  target_column: Exited\n").unwrap();

        cmd_init(dir.path()).unwrap();

        for d in PROJECT_DIRS {
            assert!(dir.path().join(d).is_dir());
        }
        let kept = std::fs::read_to_string(&config_path).unwrap();
        assert!(kept.contains("Exited"));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let config = AppConfig::load(dir.path().join(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(config.data.target_column, "Churn");
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["churn", "predict", "-d", "in.csv", "--threshold", "0.3"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(matches!(cli.command, Commands::Predict { threshold, .. } if threshold == 0.3));

        let cli = Cli::try_parse_from(["churn", "profile", "-d", "in.csv", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Commands::Profile { format: ProfileFormat::Json, top_k: 5, .. }));
    }
}
