//! Пайплайн подготовки данных: загрузка -> цель -> признаки -> split -> scaling -> артефакты

use std::collections::BTreeMap;
use std::path::PathBuf;

use ndarray::Array2;

use crate::artifacts::{persist, ArtifactSet};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::preprocessing::{
    engineer_features, fit_scale, load_dataset, normalize_target, split, Split, StandardScaler,
};
use crate::types::RawDataset;

/// Результат подготовки в памяти
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub n_rows: usize,
    pub feature_names: Vec<String>,
    pub split: Split,
    pub scaler: StandardScaler,
    pub train_scaled: Array2<f64>,
    pub test_scaled: Array2<f64>,
}

/// Итог запуска
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub input_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub n_rows: usize,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_classes: BTreeMap<usize, usize>,
    pub test_classes: BTreeMap<usize, usize>,
    pub artifacts: ArtifactSet,
    pub train_scaled: Array2<f64>,
    pub test_scaled: Array2<f64>,
}

/// Все шаги, кроме чтения файла и записи артефактов
pub fn prepare(raw: RawDataset, test_size: f64, seed: u64) -> Result<PreparedData> {
    let df = normalize_target(raw)?;
    let (features, labels) = engineer_features(&df)?;
    let split = split(&features, &labels, test_size, seed)?;
    let (scaler, train_scaled, test_scaled) = fit_scale(
        split.train.records(),
        split.test.records(),
        features.names.clone(),
    )?;

    Ok(PreparedData {
        n_rows: features.n_rows(),
        feature_names: features.names,
        split,
        scaler,
        train_scaled,
        test_scaled,
    })
}

/// Полный запуск. При ошибке новые артефакты не публикуются, предыдущий набор остаётся.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let _span = tracing::info_span!("prepare", input = %config.input_path.display()).entered();

    let raw = load_dataset(&config.input_path)?;
    let prepared = prepare(raw, config.test_size, config.seed)?;
    let artifacts = persist(&config.artifact_dir, &prepared.scaler, &prepared.split)?;

    let artifact_dir = std::fs::canonicalize(&config.artifact_dir).unwrap_or_else(|_| config.artifact_dir.clone());
    let train_classes = prepared.split.train.class_counts();
    let test_classes = prepared.split.test.class_counts();
    tracing::info!(
        "Prepared {} rows: train classes {:?}, test classes {:?}",
        prepared.n_rows,
        train_classes,
        test_classes
    );

    Ok(PipelineReport {
        input_path: config.input_path.clone(),
        artifact_dir,
        n_rows: prepared.n_rows,
        feature_names: prepared.feature_names,
        train_rows: prepared.split.train.n_rows(),
        test_rows: prepared.split.test.n_rows(),
        train_classes,
        test_classes,
        artifacts,
        train_scaled: prepared.train_scaled,
        test_scaled: prepared.test_scaled,
    })
}
