//! Synthetic data generation module
//!
//! Minority-class oversampling used to rebalance the training partition
//! before the classifier is fitted.

mod smote;

pub use smote::SMOTE;

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features, original rows first
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<i64>,
    /// Number of synthetic samples generated per class, in class order
    pub n_synthetic: Vec<(i64, usize)>,
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// How many samples every non-majority class should end up with.
///
/// `Auto` equalizes every class with the majority. `Ratio(r)` targets
/// `floor(r * N_majority)` samples per minority class; classes that already
/// have more are left alone. Configured as `auto`/`minority` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "StrategyRepr", into = "StrategyRepr")]
pub enum SamplingStrategy {
    #[default]
    Auto,
    Ratio(f64),
}

impl SamplingStrategy {
    /// Desired minority / majority ratio
    pub fn ratio(&self) -> f64 {
        match self {
            SamplingStrategy::Auto => 1.0,
            SamplingStrategy::Ratio(r) => *r,
        }
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingStrategy::Auto => write!(f, "auto"),
            SamplingStrategy::Ratio(r) => write!(f, "{}", r),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StrategyRepr {
    Ratio(f64),
    Name(String),
}

impl TryFrom<StrategyRepr> for SamplingStrategy {
    type Error = String;

    fn try_from(repr: StrategyRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            StrategyRepr::Ratio(r) => Ok(SamplingStrategy::Ratio(r)),
            StrategyRepr::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "auto" | "minority" => Ok(SamplingStrategy::Auto),
                other => Err(format!("unknown sampling strategy '{}'", other)),
            },
        }
    }
}

impl From<SamplingStrategy> for StrategyRepr {
    fn from(value: SamplingStrategy) -> Self {
        match value {
            SamplingStrategy::Auto => StrategyRepr::Name("auto".to_string()),
            SamplingStrategy::Ratio(r) => StrategyRepr::Ratio(r),
        }
    }
}

/// Get class distribution, ordered by label
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class, ordered by label
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_counts_sorted() {
        let y = array![1i64, 0, 1, 1, 0];
        let counts: Vec<(i64, usize)> = class_counts(&y).into_iter().collect();
        assert_eq!(counts, vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn test_strategy_from_yaml() {
        let auto: SamplingStrategy = serde_yaml::from_str("auto").unwrap();
        assert_eq!(auto, SamplingStrategy::Auto);
        let ratio: SamplingStrategy = serde_yaml::from_str("0.5").unwrap();
        assert_eq!(ratio, SamplingStrategy::Ratio(0.5));
        assert!(serde_yaml::from_str::<SamplingStrategy>("all").is_err());
    }
}
