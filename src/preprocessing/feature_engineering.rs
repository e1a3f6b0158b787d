//! Feature engineering для кредитного датасета

use ndarray::{Array1, Array2, Axis};

use crate::error::{PipelineError, Result};
use crate::preprocessing::target::{target_labels, TARGET_COLUMN};
use crate::types::{FeatureMatrix, RawDataset};

pub const BILL_AMT1: &str = "BILL_AMT1";
pub const LIMIT_BAL: &str = "LIMIT_BAL";
pub const PAY_PREFIX: &str = "PAY_";

pub const UTILIZATION: &str = "UTILIZATION";
pub const PAYMENT_CONSISTENCY: &str = "PAYMENT_CONSISTENCY";

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Числовая матрица из всех колонок, кроме целевой
    pub fn extract_numeric_features(df: &RawDataset) -> Result<FeatureMatrix> {
        let feature_cols: Vec<(usize, &String)> = df
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != TARGET_COLUMN)
            .collect();

        let mut values = Array2::zeros((df.n_rows(), feature_cols.len()));
        for (i, (row, &row_id)) in df.rows.iter().zip(&df.row_ids).enumerate() {
            for (j, &(col, name)) in feature_cols.iter().enumerate() {
                values[[i, j]] = row[col].to_number().ok_or_else(|| PipelineError::NonNumericFeature {
                    column: name.clone(),
                    row: row_id,
                    value: row[col].to_string(),
                })?;
            }
        }

        Ok(FeatureMatrix {
            names: feature_cols.into_iter().map(|(_, name)| name.clone()).collect(),
            index: df.row_ids.clone(),
            values,
        })
    }

    /// Загрузка кредитного лимита: BILL_AMT1 / LIMIT_BAL, нулевой лимит считается за 1
    pub fn utilization(features: &FeatureMatrix) -> Option<Array1<f64>> {
        let bill = features.column(BILL_AMT1)?;
        let limit = features.column(LIMIT_BAL)?;

        Some(
            bill.iter()
                .zip(limit.iter())
                .map(|(&b, &l)| b / if l == 0.0 { 1.0 } else { l })
                .collect(),
        )
    }

    /// Число месяцев с просрочкой: колонки PAY_* со значением > 0
    pub fn payment_consistency(features: &FeatureMatrix) -> Option<Array1<f64>> {
        let pay_cols: Vec<usize> = features
            .names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(PAY_PREFIX))
            .map(|(idx, _)| idx)
            .collect();

        if pay_cols.is_empty() {
            return None;
        }

        Some(
            features
                .values
                .rows()
                .into_iter()
                .map(|row| pay_cols.iter().filter(|&&c| row[c] > 0.0).count() as f64)
                .collect(),
        )
    }

    fn append_column(features: &mut FeatureMatrix, name: &str, column: Array1<f64>) -> Result<()> {
        features
            .values
            .push_column(column.view())
            .map_err(|_| PipelineError::ShapeMismatch {
                expected: features.n_rows(),
                found: column.len(),
            })?;
        features.names.push(name.to_string());
        Ok(())
    }
}

/// Убирает цель из таблицы и добавляет UTILIZATION / PAYMENT_CONSISTENCY,
/// если в данных есть нужные колонки.
pub fn engineer_features(df: &RawDataset) -> Result<(FeatureMatrix, Array1<usize>)> {
    let labels = Array1::from(target_labels(df)?);
    let mut features = FeatureEngineer::extract_numeric_features(df)?;

    // Оба признака считаются по исходным колонкам
    let utilization = FeatureEngineer::utilization(&features);
    let consistency = FeatureEngineer::payment_consistency(&features);

    match utilization {
        Some(column) => FeatureEngineer::append_column(&mut features, UTILIZATION, column)?,
        None => tracing::debug!("Skipping {}: {} or {} missing", UTILIZATION, BILL_AMT1, LIMIT_BAL),
    }
    match consistency {
        Some(column) => FeatureEngineer::append_column(&mut features, PAYMENT_CONSISTENCY, column)?,
        None => tracing::debug!("Skipping {}: no {}* columns", PAYMENT_CONSISTENCY, PAY_PREFIX),
    }

    tracing::info!(
        "Feature matrix: {} rows x {} features",
        features.values.len_of(Axis(0)),
        features.n_features()
    );

    Ok((features, labels))
}
