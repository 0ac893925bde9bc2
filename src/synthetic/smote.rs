//! SMOTE oversampling

use crate::error::{ChurnError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler, SamplingStrategy};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::info;

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique).
///
/// Each synthetic row lies on the segment between a randomly chosen class
/// member and one of its `k` nearest same-class neighbours. Original rows are
/// kept unchanged and come first in the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    sampling_strategy: SamplingStrategy,
    /// Random seed
    seed: Option<u64>,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            sampling_strategy: SamplingStrategy::Auto,
            seed: None,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    pub fn with_sampling_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.sampling_strategy = strategy;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Target count per class computed by `fit`
    pub fn target_counts(&self) -> Option<&BTreeMap<i64, usize>> {
        self.target_counts.as_ref()
    }

    /// Squared Euclidean distance
    fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// k nearest members of `rows` to `rows[center]`, excluding itself
    fn find_neighbors(x: &Array2<f64>, rows: &[usize], center: usize, k: usize) -> Vec<usize> {
        let point = x.row(rows[center]);
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, &row) in rows.iter().enumerate() {
            if i == center {
                continue;
            }
            let candidate = DistIdx(Self::distance(point, x.row(row)), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        let mut neighbors: Vec<usize> = heap.into_iter().map(|DistIdx(_, i)| i).collect();
        neighbors.sort_unstable();
        neighbors
    }

    /// Generate synthetic sample between two points
    fn generate_sample(point: ArrayView1<f64>, neighbor: ArrayView1<f64>, rng: &mut StdRng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(ChurnError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        let ratio = self.sampling_strategy.ratio();

        let targets = counts
            .iter()
            .map(|(&class, &count)| {
                let target = (max_count as f64 * ratio).floor() as usize;
                (class, target.max(count))
            })
            .collect();

        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or_else(|| ChurnError::ValidationError("SMOTE not fitted".to_string()))?;

        if x.nrows() != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let indices = class_indices(y);
        let n_features = x.ncols();

        // Collect only synthetic samples (original data reused from x directly)
        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = Vec::with_capacity(targets.len());

        for (&class, &target_count) in targets {
            let members = indices.get(&class).map(Vec::as_slice).unwrap_or(&[]);
            let n_to_generate = target_count.saturating_sub(members.len());

            if n_to_generate == 0 {
                n_synthetic.push((class, 0));
                continue;
            }
            if members.len() < 2 {
                return Err(ChurnError::ValidationError(format!(
                    "SMOTE needs at least 2 samples of class {} to interpolate, found {}",
                    class,
                    members.len()
                )));
            }

            let k = self.k_neighbors.min(members.len() - 1);
            let mut neighbor_cache: Vec<Option<Vec<usize>>> = vec![None; members.len()];

            for _ in 0..n_to_generate {
                let center = rng.gen_range(0..members.len());
                let neighbors = neighbor_cache[center]
                    .get_or_insert_with(|| Self::find_neighbors(x, members, center, k));
                let pick = neighbors[rng.gen_range(0..neighbors.len())];

                let sample = Self::generate_sample(x.row(members[center]), x.row(members[pick]), &mut rng);
                synthetic_x.extend(sample);
                synthetic_y.push(class);
            }

            n_synthetic.push((class, n_to_generate));
        }

        let n_new = synthetic_y.len();
        let new_rows = Array2::from_shape_vec((n_new, n_features), synthetic_x)?;

        let mut x_out = Array2::zeros((x.nrows() + n_new, n_features));
        x_out.slice_mut(ndarray::s![..x.nrows(), ..]).assign(x);
        x_out.slice_mut(ndarray::s![x.nrows().., ..]).assign(&new_rows);

        let y_out: Array1<i64> = y.iter().copied().chain(synthetic_y).collect();

        info!(
            original = x.nrows(),
            synthetic = n_new,
            total = x_out.nrows(),
            "SMOTE applied"
        );

        Ok(ResampleResult {
            x: x_out,
            y: y_out,
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (Array2<f64>, Array1<i64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.extend([i as f64, (i % 4) as f64]);
            labels.push(0);
        }
        for i in 0..5 {
            rows.extend([100.0 + i as f64, 50.0 - i as f64]);
            labels.push(1);
        }
        (
            Array2::from_shape_vec((25, 2), rows).unwrap(),
            Array1::from_vec(labels),
        )
    }

    #[test]
    fn test_auto_balances_classes() {
        let (x, y) = imbalanced();
        let mut smote = SMOTE::new().with_seed(42);
        let result = smote.fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts[&0], 20);
        assert_eq!(counts[&1], 20);
        assert_eq!(result.n_synthetic, vec![(0, 0), (1, 15)]);
        // originals untouched and first
        assert_eq!(result.x.row(3), x.row(3));
    }

    #[test]
    fn test_synthetic_rows_within_class_hull() {
        let (x, y) = imbalanced();
        let result = SMOTE::new().with_seed(7).fit_resample(&x, &y).unwrap();

        for row in result.x.rows().into_iter().skip(25) {
            assert!(row[0] >= 100.0 && row[0] <= 104.0);
            assert!(row[1] >= 46.0 && row[1] <= 50.0);
        }
    }

    #[test]
    fn test_ratio_strategy() {
        let (x, y) = imbalanced();
        let result = SMOTE::new()
            .with_sampling_strategy(SamplingStrategy::Ratio(0.5))
            .with_seed(1)
            .fit_resample(&x, &y)
            .unwrap();
        assert_eq!(class_counts(&result.y)[&1], 10);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let (x, y) = imbalanced();
        let a = SMOTE::new().with_seed(3).fit_resample(&x, &y).unwrap();
        let b = SMOTE::new().with_seed(3).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::zeros((3, 2));
        let y = Array1::from_vec(vec![1i64, 1, 1]);
        assert!(SMOTE::new().fit_resample(&x, &y).is_err());
    }

    #[test]
    fn test_singleton_minority_rejected() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 9.0]).unwrap();
        let y = Array1::from_vec(vec![0i64, 0, 0, 1]);
        let err = SMOTE::new().fit_resample(&x, &y).unwrap_err();
        assert!(err.to_string().contains("at least 2 samples"));
    }
}
