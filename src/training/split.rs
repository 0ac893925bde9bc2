//! Stratified train/test split

use crate::error::{ChurnError, Result};
use crate::synthetic::class_indices;
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of each partition, ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so each class keeps its proportion in both partitions.
///
/// The test partition gets `ceil(test_size * n)` rows, shared between classes
/// by largest remainder, with at least one row of every class on each side.
/// The same labels, `test_size` and seed always give the same split.
pub fn stratified_split(y: &Array1<i64>, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ChurnError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n = y.len();
    let classes = class_indices(y);
    for (label, members) in &classes {
        if members.len() < 2 {
            return Err(ChurnError::TrainingError(format!(
                "The least populated class ({}) has only {} member(s); at least 2 are required to stratify",
                label,
                members.len()
            )));
        }
    }

    let n_classes = classes.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test < n_classes || n - n_test < n_classes {
        return Err(ChurnError::TrainingError(format!(
            "test_size={} gives {} test and {} train rows, fewer than the {} classes",
            test_size,
            n_test,
            n - n_test,
            n_classes
        )));
    }

    let counts: Vec<usize> = classes.values().map(Vec::len).collect();
    let allocation = allocate(&counts, n, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);

    for ((_, members), take) in classes.into_iter().zip(allocation) {
        let mut members = members;
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

/// Share `n_test` between classes of sizes `counts` (largest remainder),
/// keeping every class within `1..=count-1`
fn allocate(counts: &[usize], n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| n_test as f64 * c as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(counts[b].cmp(&counts[a])).then(a.cmp(&b))
    });
    let mut remaining = n_test - alloc.iter().sum::<usize>();
    for &i in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        alloc[i] += 1;
        remaining -= 1;
    }

    // At least one row per class on each side
    for i in 0..counts.len() {
        while alloc[i] == 0 {
            if let Some(donor) = (0..counts.len())
                .filter(|&j| j != i && alloc[j] > 1)
                .max_by_key(|&j| alloc[j])
            {
                alloc[donor] -= 1;
                alloc[i] += 1;
            } else {
                break;
            }
        }
        while alloc[i] >= counts[i] {
            if let Some(receiver) = (0..counts.len())
                .filter(|&j| j != i && alloc[j] + 1 < counts[j])
                .max_by_key(|&j| counts[j] - alloc[j])
            {
                alloc[receiver] += 1;
                alloc[i] -= 1;
            } else {
                break;
            }
        }
    }

    alloc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_class_ratio() {
        let y: Array1<i64> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_pos, 4);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let y: Array1<i64> = (0..37).map(|i| (i % 3 == 0) as i64).collect();
        let split = stratified_split(&y, 0.25, 7).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_tiny_balanced_table() {
        let y = Array1::from_vec(vec![1i64, 0, 1, 0, 1, 0]);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 2);
        assert!(split.test.iter().any(|&i| y[i] == 0));
        assert!(split.test.iter().any(|&i| y[i] == 1));
    }

    #[test]
    fn test_same_seed_same_split() {
        let y: Array1<i64> = (0..50).map(|i| (i % 5 == 0) as i64).collect();
        assert_eq!(
            stratified_split(&y, 0.3, 1).unwrap(),
            stratified_split(&y, 0.3, 1).unwrap()
        );
        assert_ne!(
            stratified_split(&y, 0.3, 1).unwrap(),
            stratified_split(&y, 0.3, 2).unwrap()
        );
    }

    #[test]
    fn test_singleton_class_rejected() {
        let y = Array1::from_vec(vec![0i64, 0, 0, 1]);
        assert!(stratified_split(&y, 0.5, 0).is_err());
    }

    #[test]
    fn test_minority_gets_a_test_row() {
        // 2% positives: exact share rounds to zero
        let y: Array1<i64> = (0..100).map(|i| (i < 2) as i64).collect();
        let split = stratified_split(&y, 0.1, 3).unwrap();
        assert_eq!(split.test.iter().filter(|&&i| y[i] == 1).count(), 1);
        assert_eq!(split.train.iter().filter(|&&i| y[i] == 1).count(), 1);
    }
}
