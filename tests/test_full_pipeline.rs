//! Integration test: full pipeline from CSV to scored predictions

use churn_pipeline::config::AppConfig;
use churn_pipeline::error::ChurnError;
use churn_pipeline::export::ArtifactPaths;
use churn_pipeline::inference::{ChurnPredictor, PROBABILITY_COLUMN};
use churn_pipeline::pipeline::ChurnPipeline;
use churn_pipeline::tracking::ExperimentTracker;
use churn_pipeline::utils::DataLoader;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];

/// Telco-style export with one blank `TotalCharges` and one duplicated row
fn write_dataset(dir: &Path, n: usize) -> PathBuf {
    let mut csv = String::from(
        "customerID,gender,SeniorCitizen,tenure,Contract,MonthlyCharges,TotalCharges,Churn\n",
    );
    for i in 0..n {
        let churn = i % 3 == 0;
        let tenure = if churn { 1 + i % 12 } else { 12 + i % 60 };
        let contract = if churn { CONTRACTS[i % 2] } else { CONTRACTS[1 + i % 2] };
        let monthly = 20.0 + (i * 7 % 80) as f64 + 0.5;
        let total = if i == 5 {
            " ".to_string()
        } else {
            format!("{:.2}", tenure as f64 * monthly)
        };
        writeln!(
            csv,
            "C{:04},{},{},{},{},{},{},{}",
            i,
            if i % 2 == 0 { "Male" } else { "Female" },
            (i % 5 == 0) as u8,
            tenure,
            contract,
            monthly,
            total,
            if churn { "Yes" } else { "No" }
        )
        .unwrap();
    }
    // exact repeat of the first data row
    let first = csv.lines().nth(1).unwrap().to_string();
    writeln!(csv, "{}", first).unwrap();

    let path = dir.join("churn.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn artifact_paths(config: &AppConfig) -> ArtifactPaths {
    ArtifactPaths {
        model: config.paths.model_path(),
        scaler: config.paths.scaler_path(),
        encoder: config.paths.encoder_path(),
    }
}

#[test]
fn test_full_pipeline_trains_and_scores() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 90);
    let config = AppConfig::default().with_output_root(dir.path());

    let report = ChurnPipeline::new(config.clone()).run(&data).unwrap();

    // raw table: coercion, duplicate and missing-value warnings
    assert!(!report.initial_report.passed);
    assert!(report
        .initial_report
        .warnings
        .iter()
        .any(|w| w == "1 duplicate rows found"));
    // cleaned table: nothing left to complain about
    assert!(report.post_clean_report.passed, "{:?}", report.post_clean_report.warnings);
    assert_eq!(report.rows_loaded, 91);
    assert_eq!(report.rows_after_cleaning, 90);

    let outcome = &report.outcome;
    assert!(!outcome.feature_names.contains(&"customerID".to_string()));
    assert!(outcome.feature_names.contains(&"Contract_One year".to_string()));
    assert!(outcome.metrics.roc_auc > 0.5);
    assert!(outcome.n_resampled >= outcome.n_train);

    let paths = artifact_paths(&config);
    assert!(paths.model.is_file());
    assert!(paths.scaler.is_file());
    assert!(paths.encoder.is_file());

    let tracker = ExperimentTracker::from_uri(&config.mlflow.tracking_uri, &config.mlflow.experiment_name).unwrap();
    assert_eq!(tracker.list_runs().unwrap().len(), 1);

    let predictor = ChurnPredictor::load(&paths).unwrap();
    assert_eq!(predictor.artifacts().training_run_id, outcome.training_run_id);

    let raw = DataLoader::new().load_csv(&data).unwrap();
    let (scored, summary) = predictor.predict(&raw).unwrap();
    assert_eq!(scored.height(), raw.height());
    assert_eq!(summary.rows, 91);
    let proba = scored.column(PROBABILITY_COLUMN).unwrap().f64().unwrap();
    assert!(proba.into_no_null_iter().all(|p| (0.0..=1.0).contains(&p)));
}

#[test]
fn test_post_clean_warnings_can_block_training() {
    let dir = tempfile::tempdir().unwrap();
    // 30 rows stays below the default 50-row threshold after cleaning
    let data = write_dataset(dir.path(), 30);
    let mut config = AppConfig::default().with_output_root(dir.path());
    config.validation.fail_on_post_clean_warnings = true;

    let err = ChurnPipeline::new(config.clone()).run(&data).unwrap_err();
    assert!(matches!(err, ChurnError::ValidationError(ref msg) if msg.contains("only 30 rows")));
    assert!(!config.paths.model_path().exists());
}

#[test]
fn test_post_clean_warnings_are_non_fatal_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 30);
    let config = AppConfig::default().with_output_root(dir.path());

    let report = ChurnPipeline::new(config).run(&data).unwrap();
    assert!(!report.post_clean_report.passed);
    assert!(report
        .post_clean_report
        .warnings
        .iter()
        .any(|w| w.contains("only 30 rows")));
}

#[test]
fn test_validate_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 60);
    let config = AppConfig::default().with_output_root(dir.path());

    let outcome = ChurnPipeline::new(config.clone()).validate_file(&data).unwrap();
    assert_eq!(outcome.data.height(), 61);
    assert!(outcome
        .report
        .warnings
        .iter()
        .any(|w| w.contains("'TotalCharges'")));
    assert!(!config.paths.model_dir.exists());
}
