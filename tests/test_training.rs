//! Integration test: training stage

use churn_pipeline::error::ChurnError;
use churn_pipeline::export::{ArtifactPaths, ArtifactSet};
use churn_pipeline::training::{prepare_training_data, stratified_split, Trainer, TrainingConfig};
use ndarray::Axis;
use polars::prelude::*;
use std::path::Path;

fn balanced_df() -> DataFrame {
    df!(
        "tenure" => &[1.0, 2.0, 3.0, 40.0, 50.0, 60.0],
        "MonthlyCharges" => &[90.0, 85.0, 95.0, 30.0, 25.0, 20.0],
        "SeniorCitizen" => &[1i32, 0, 1, 0, 0, 1],
        "Churn" => &[1i32, 1, 1, 0, 0, 0]
    )
    .unwrap()
}

fn config_in(dir: &Path) -> TrainingConfig {
    TrainingConfig::default()
        .with_model_dir(dir.join("models"))
        .with_tracking_uri(format!("file:{}", dir.join("mlruns").display()))
}

#[test]
fn test_training_on_balanced_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let outcome = Trainer::new(config.clone()).train(&balanced_df(), None).unwrap();

    assert!(outcome.model.is_fitted);
    assert!(outcome.scaler.is_fitted());
    assert_eq!(outcome.feature_names, vec!["tenure", "MonthlyCharges", "SeniorCitizen"]);
    assert_eq!(outcome.n_train + outcome.n_test, 6);
    assert_eq!(outcome.n_test, 2);
    assert!((0.0..=1.0).contains(&outcome.metrics.roc_auc));
    assert!((0.0..=1.0).contains(&outcome.metrics.accuracy));

    assert!(config.model_path().is_file());
    assert!(config.scaler_path().is_file());
    assert!(!config.encoder_path().exists());
}

#[test]
fn test_scaled_train_partition_is_centered() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let df = balanced_df();
    let outcome = Trainer::new(config.clone()).train(&df, None).unwrap();

    let (_, x, y) = prepare_training_data(&df, "Churn").unwrap();
    let split = stratified_split(&y.mapv(|v| v as i64), config.test_size, config.random_state).unwrap();
    let train = x.select(Axis(0), &split.train);
    let scaled = outcome.scaler.transform(&train).unwrap();

    for mean in scaled.mean_axis(Axis(0)).unwrap().iter() {
        assert!(mean.abs() < 1e-9, "column mean {mean}");
    }
}

#[test]
fn test_scaler_ignores_test_rows() {
    let df = balanced_df();
    let config = TrainingConfig::default();
    let (_, _, y) = prepare_training_data(&df, "Churn").unwrap();
    let split = stratified_split(&y.mapv(|v| v as i64), config.test_size, config.random_state).unwrap();

    // same labels, wildly different predictor values on the held-out rows only
    let tenure: Vec<f64> = (0..6)
        .map(|i| {
            let base = df.column("tenure").unwrap().f64().unwrap().get(i).unwrap();
            if split.test.contains(&i) { base * 1000.0 } else { base }
        })
        .collect();
    let mut shifted = df.clone();
    shifted.with_column(Series::new("tenure".into(), tenure)).unwrap();

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = Trainer::new(config_in(dir_a.path())).train(&df, None).unwrap();
    let b = Trainer::new(config_in(dir_b.path())).train(&shifted, None).unwrap();

    assert_eq!(a.scaler.center(), b.scaler.center());
    assert_eq!(a.scaler.scale(), b.scaler.scale());
}

#[test]
fn test_tracking_failure_does_not_block() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path()).with_tracking_uri("http://tracking.invalid:5000");
    let outcome = Trainer::new(config.clone()).train(&balanced_df(), None).unwrap();

    assert!(outcome.run.is_none());
    assert!(config.model_path().is_file());
}

#[test]
fn test_run_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = Trainer::new(config_in(dir.path())).train(&balanced_df(), None).unwrap();

    let run = outcome.run.expect("tracked run");
    assert_eq!(run.tags["training_run_id"], outcome.training_run_id);
    assert_eq!(run.params["solver"], "lbfgs");
    assert!(run.metrics.contains_key("roc_auc"));
    assert_eq!(run.artifacts.len(), 1);
    let tracked = Path::new(&run.artifacts[0]);
    assert!(tracked.is_file());
    assert!(tracked.starts_with(dir.path().join("mlruns")));

    let run_json = dir
        .path()
        .join("mlruns")
        .join("churn_prediction")
        .join(&run.run_id)
        .join("run.json");
    assert!(run_json.is_file());
}

#[test]
fn test_persisted_pair_shares_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let outcome = Trainer::new(config.clone()).train(&balanced_df(), None).unwrap();

    let loaded = ArtifactSet::load(&ArtifactPaths {
        model: config.model_path(),
        scaler: config.scaler_path(),
        encoder: config.encoder_path(),
    })
    .unwrap();
    assert_eq!(loaded.training_run_id, outcome.training_run_id);
    assert_eq!(loaded.feature_names, outcome.feature_names);
    assert_eq!(loaded.model.coefficients, outcome.model.coefficients);
}

#[test]
fn test_mismatched_pair_rejected() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = config_in(dir_a.path());
    let b = config_in(dir_b.path());
    Trainer::new(a.clone()).train(&balanced_df(), None).unwrap();
    Trainer::new(b.clone()).train(&balanced_df(), None).unwrap();

    let err = ArtifactSet::load(&ArtifactPaths {
        model: a.model_path(),
        scaler: b.scaler_path(),
        encoder: a.encoder_path(),
    })
    .unwrap_err();
    assert!(matches!(err, ChurnError::ArtifactMismatch(_)));
}

#[test]
fn test_text_predictor_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut df = balanced_df();
    df.with_column(Series::new("gender".into(), &["M", "F", "M", "F", "M", "F"]))
        .unwrap();
    let err = Trainer::new(config_in(dir.path())).train(&df, None).unwrap_err();
    assert!(matches!(err, ChurnError::FeatureError(_)));
}
