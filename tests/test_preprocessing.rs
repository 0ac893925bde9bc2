//! Integration test: cleaning stage

use churn_pipeline::config::PreprocessConfig;
use churn_pipeline::preprocessing::{profile, ColumnType, DataPreprocessor};
use polars::prelude::*;
use proptest::prelude::*;

fn sample_df() -> DataFrame {
    df!(
        "tenure" => &[Some(10.0), None, Some(5.0)],
        "MonthlyCharges" => &[Some(70.5), Some(80.0), None],
        "TotalCharges" => &[Some(700.0), Some(800.0), None],
        "Churn" => &["Yes", "No", "Yes"]
    )
    .unwrap()
}

fn null_total(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}

#[test]
fn test_median_imputation_scenario() {
    let cleaned = DataPreprocessor::new().preprocess(&sample_df()).unwrap();
    assert_eq!(null_total(&cleaned), 0);
    assert_eq!(cleaned.height(), 3);

    let tenure = cleaned.column("tenure").unwrap().f64().unwrap();
    assert_eq!(tenure.get(1), Some(7.5));
    let monthly = cleaned.column("MonthlyCharges").unwrap().f64().unwrap();
    assert_eq!(monthly.get(2), Some(75.25));
}

#[test]
fn test_text_fill_value_from_config() {
    let df = df!(
        "gender" => &[Some("Male"), None, Some("Female")],
        "tenure" => &[1.0, 2.0, 3.0]
    )
    .unwrap();
    let config = PreprocessConfig {
        text_fill_value: "Missing".to_string(),
    };
    let cleaned = DataPreprocessor::from_config(&config).preprocess(&df).unwrap();
    let gender = cleaned.column("gender").unwrap().str().unwrap();
    assert_eq!(gender.get(1), Some("Missing"));
}

#[test]
fn test_duplicates_removed_keeping_first() {
    let df = df!(
        "tenure" => &[1.0, 2.0, 1.0, 3.0],
        "Churn" => &["Yes", "No", "Yes", "No"]
    )
    .unwrap();
    let cleaned = DataPreprocessor::new().preprocess(&df).unwrap();
    assert_eq!(cleaned.height(), 3);
    let tenure = cleaned.column("tenure").unwrap().f64().unwrap();
    assert_eq!(tenure.into_no_null_iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_input_not_mutated() {
    let df = sample_df();
    let _ = DataPreprocessor::new().preprocess(&df).unwrap();
    assert_eq!(null_total(&df), 4);
}

#[test]
fn test_profile_statistics() {
    let stats = profile(&sample_df(), 3).unwrap();
    assert_eq!(stats.len(), 4);

    let tenure = &stats[0];
    assert_eq!(tenure.dtype, ColumnType::Numeric);
    assert_eq!(tenure.null_count, 1);
    assert_eq!(tenure.mean, Some(7.5));
    assert_eq!(tenure.min, Some(5.0));

    let churn = &stats[3];
    assert_eq!(churn.dtype, ColumnType::Categorical);
    let top = churn.top_categories.as_ref().unwrap();
    assert_eq!(top[0], ("Yes".to_string(), 2));
}

fn numeric_column() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::of(0.0f64..100.0), 1..25).prop_map(|mut v| {
        if v.iter().all(Option::is_none) {
            v[0] = Some(1.0);
        }
        v
    })
}

fn table() -> impl Strategy<Value = DataFrame> {
    numeric_column().prop_flat_map(|a| {
        let n = a.len();
        (
            Just(a),
            prop::collection::vec(prop::option::of(0i64..5), n),
            prop::collection::vec(prop::option::of(prop::sample::select(vec!["Yes", "No", "Maybe"])), n),
        )
            .prop_map(|(a, b, c)| {
                let mut b = b;
                if b.iter().all(Option::is_none) {
                    b[0] = Some(0);
                }
                df!("a" => a, "b" => b, "c" => c).unwrap()
            })
    })
}

proptest! {
    #[test]
    fn prop_no_nulls_after_preprocessing(df in table()) {
        let cleaned = DataPreprocessor::new().preprocess(&df).unwrap();
        prop_assert_eq!(null_total(&cleaned), 0);
        prop_assert!(cleaned.height() <= df.height());
    }

    #[test]
    fn prop_preprocessing_is_idempotent(df in table()) {
        let preprocessor = DataPreprocessor::new();
        let once = preprocessor.preprocess(&df).unwrap();
        let twice = preprocessor.preprocess(&once).unwrap();
        prop_assert!(once.equals(&twice));
    }
}
