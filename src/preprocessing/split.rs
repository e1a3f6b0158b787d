//! Стратифицированное разбиение на train / test

use std::collections::BTreeMap;

use linfa::Dataset;
use ndarray::{Array1, Array2, Ix1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::types::FeatureMatrix;

pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// Часть выборки: признаки и метки плюс номера исходных строк
#[derive(Debug, Clone)]
pub struct Partition {
    pub data: Dataset<f64, usize, Ix1>,
    pub index: Vec<usize>,
}

impl Partition {
    fn from_rows(features: &FeatureMatrix, labels: &Array1<usize>, rows: &[usize]) -> Self {
        let subset = features.select_rows(rows);
        let targets: Array1<usize> = rows.iter().map(|&r| labels[r]).collect();

        Self {
            data: Dataset::new(subset.values, targets).with_feature_names(subset.names),
            index: subset.index,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.data.records.nrows()
    }

    pub fn records(&self) -> &Array2<f64> {
        &self.data.records
    }

    pub fn targets(&self) -> &Array1<usize> {
        &self.data.targets
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.data.feature_names()
    }

    /// Количество объектов каждого класса
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for &label in self.targets() {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone)]
pub struct Split {
    pub train: Partition,
    pub test: Partition,
}

/// Разбиение с сохранением долей классов. Для одного `seed` результат всегда одинаков.
pub fn split(
    features: &FeatureMatrix,
    labels: &Array1<usize>,
    test_size: f64,
    seed: u64,
) -> Result<Split> {
    let n_samples = features.n_rows();
    if labels.len() != n_samples {
        return Err(PipelineError::ShapeMismatch {
            expected: n_samples,
            found: labels.len(),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::insufficient(format!(
            "test size must be in (0, 1), got {test_size}"
        )));
    }

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(row);
    }

    if let Some((label, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::insufficient(format!(
            "class {label} has {} member(s), stratified split needs at least 2",
            rows.len()
        )));
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples - n_test;
    let n_classes = by_class.len();
    if n_train < n_classes || n_test < n_classes {
        return Err(PipelineError::insufficient(format!(
            "{n_samples} rows cannot be split into {n_train} train / {n_test} test rows over {n_classes} classes"
        )));
    }

    let class_sizes: Vec<usize> = by_class.values().map(Vec::len).collect();
    let test_per_class = allocate(n_test, &class_sizes);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_rows = Vec::with_capacity(n_train);
    let mut test_rows = Vec::with_capacity(n_test);
    for (rows, &take) in by_class.values_mut().zip(&test_per_class) {
        rows.shuffle(&mut rng);
        test_rows.extend_from_slice(&rows[..take]);
        train_rows.extend_from_slice(&rows[take..]);
    }
    train_rows.shuffle(&mut rng);
    test_rows.shuffle(&mut rng);

    tracing::info!(
        "Stratified split (seed {}): {} train / {} test rows",
        seed,
        train_rows.len(),
        test_rows.len()
    );

    Ok(Split {
        train: Partition::from_rows(features, labels, &train_rows),
        test: Partition::from_rows(features, labels, &test_rows),
    })
}

/// Распределяет `total` по классам пропорционально размерам (метод наибольшего остатка)
fn allocate(total: usize, sizes: &[usize]) -> Vec<usize> {
    let n: usize = sizes.iter().sum();
    let exact: Vec<f64> = sizes
        .iter()
        .map(|&s| total as f64 * s as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = total - counts.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });

    for idx in order {
        if remaining == 0 {
            break;
        }
        if counts[idx] < sizes[idx] {
            counts[idx] += 1;
            remaining -= 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize) -> FeatureMatrix {
        FeatureMatrix {
            names: vec!["x".into(), "y".into()],
            index: (0..n).collect(),
            values: Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64),
        }
    }

    fn labels(n: usize, positives: usize) -> Array1<usize> {
        (0..n).map(|i| usize::from(i < positives)).collect()
    }

    #[test]
    fn test_split_sizes_and_stratification() {
        let features = matrix(1000);
        let y = labels(1000, 220);
        let split = split(&features, &y, 0.2, 42).unwrap();

        assert_eq!(split.train.n_rows(), 800);
        assert_eq!(split.test.n_rows(), 200);
        assert_eq!(split.train.targets().len(), 800);
        assert_eq!(split.test.class_counts().get(&1), Some(&44));
        assert_eq!(split.train.class_counts().get(&1), Some(&176));
        assert_eq!(split.train.feature_names(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_split_is_deterministic() {
        let features = matrix(50);
        let y = labels(50, 10);
        let a = split(&features, &y, 0.2, 7).unwrap();
        let b = split(&features, &y, 0.2, 7).unwrap();
        assert_eq!(a.train.index, b.train.index);
        assert_eq!(a.test.index, b.test.index);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let features = matrix(37);
        let y = labels(37, 9);
        let split = split(&features, &y, 0.2, 1).unwrap();

        let mut all: Vec<usize> = split.train.index.iter().chain(&split.test.index).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());

        // Строки матрицы соответствуют своим индексам
        for (row, &src) in split.test.index.iter().enumerate() {
            assert_eq!(split.test.records()[[row, 0]], (src * 2) as f64);
            assert_eq!(split.test.targets()[row], y[src]);
        }
    }

    #[test]
    fn test_singleton_class_is_rejected() {
        let features = matrix(10);
        let y = labels(10, 1);
        let err = split(&features, &y, 0.2, 42).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn test_too_few_rows_is_rejected() {
        let features = matrix(4);
        let y = labels(4, 2);
        let err = split(&features, &y, 0.2, 42).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn test_invalid_test_size() {
        let features = matrix(10);
        let y = labels(10, 5);
        assert!(split(&features, &y, 1.0, 42).is_err());
        assert!(split(&features, &y, 0.0, 42).is_err());
    }

    #[test]
    fn test_allocate_largest_remainder() {
        assert_eq!(allocate(200, &[780, 220]), vec![156, 44]);
        assert_eq!(allocate(3, &[5, 5]), vec![2, 1]);
        assert_eq!(allocate(2, &[3, 3, 3]), vec![1, 1, 0]);
    }
}
