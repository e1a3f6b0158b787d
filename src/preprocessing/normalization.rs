//! Нормализация данных

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Приведение признаков к нулевому среднему и единичной дисперсии
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Option<Array1<f64>>,
    var: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
    n_samples_seen: usize,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            feature_names: Vec::new(),
            mean: None,
            var: None,
            scale: None,
            n_samples_seen: 0,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::insufficient("cannot fit scaler on an empty dataset"));
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != X.ncols() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.feature_names.len(),
                found: X.ncols(),
            });
        }

        // Среднее и дисперсия по каждому признаку (ddof = 0)
        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::insufficient("failed to compute mean"))?;
        let var = X.var_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        let scale = var.mapv(|v| {
            let std = v.sqrt();
            if std < 1e-10 {
                1.0
            } else {
                std
            }
        });

        self.mean = Some(mean);
        self.var = Some(var);
        self.scale = Some(scale);
        self.n_samples_seen = X.nrows();
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(PipelineError::NotFitted),
        };

        if X.ncols() != mean.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: mean.len(),
                found: X.ncols(),
            });
        }

        // (X - mean) / std
        Ok((X - mean) / scale)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn var(&self) -> Option<&Array1<f64>> {
        self.var.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    /// Средние значения по имени признака, в порядке признаков
    pub fn feature_means(&self) -> Result<Vec<(String, f64)>> {
        let mean = self.mean.as_ref().ok_or(PipelineError::NotFitted)?;
        Ok(self
            .feature_names
            .iter()
            .cloned()
            .zip(mean.iter().copied())
            .collect())
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

/// Обучает скейлер только на train и преобразует обе части
pub fn fit_scale(
    X_train: &Array2<f64>,
    X_test: &Array2<f64>,
    feature_names: Vec<String>,
) -> Result<(StandardScaler, Array2<f64>, Array2<f64>)> {
    let mut scaler = StandardScaler::new().with_feature_names(feature_names);
    let train_scaled = scaler.fit_transform(X_train)?;
    let test_scaled = scaler.transform(X_test)?;

    tracing::info!(
        "Scaler fitted on {} train rows, {} features",
        scaler.n_samples_seen(),
        train_scaled.ncols()
    );

    Ok((scaler, train_scaled, test_scaled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let X = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&X).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        let std = scaled.std_axis(Axis(0), 0.0);
        for j in 0..2 {
            assert!(mean[j].abs() < 1e-12);
            assert!((std[j] - 1.0).abs() < 1e-12);
        }
        assert_eq!(scaler.mean().unwrap().to_vec(), vec![2.5, 25.0]);
        assert_eq!(scaler.n_samples_seen(), 4);
    }

    #[test]
    fn test_constant_feature_keeps_unit_scale() {
        let X = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&X).unwrap();
        assert_eq!(scaler.scale().unwrap()[0], 1.0);
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::NotFitted));
    }

    #[test]
    fn test_fit_scale_uses_train_statistics_only() {
        let train = array![[0.0], [2.0]];
        let test = array![[100.0], [102.0]];
        let (scaler, train_scaled, test_scaled) = fit_scale(&train, &test, vec!["x".into()]).unwrap();

        assert_eq!(scaler.mean().unwrap()[0], 1.0);
        assert_eq!(scaler.scale().unwrap()[0], 1.0);
        assert_eq!(train_scaled.column(0).to_vec(), vec![-1.0, 1.0]);
        assert_eq!(test_scaled.column(0).to_vec(), vec![99.0, 101.0]);
        assert_eq!(scaler.feature_means().unwrap(), vec![("x".to_string(), 1.0)]);
    }

    #[test]
    fn test_shape_mismatch_on_transform() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { expected: 2, found: 1 }));
    }
}
