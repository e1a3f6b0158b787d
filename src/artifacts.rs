//! Артефакты подготовки данных: запись и чтение набора файлов
//!
//! Файлы пишутся во временный каталог внутри целевого и переносятся
//! переименованием. Если перенос не удался, предыдущий набор возвращается.
//! Чужие файлы в каталоге артефактов сохраняются.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::preprocessing::normalization::StandardScaler;
use crate::preprocessing::split::{Partition, Split};
use crate::preprocessing::target::TARGET_COLUMN;

pub const SCALER_FILE: &str = "scaler.json";
pub const X_TRAIN_FILE: &str = "X_train.json";
pub const Y_TRAIN_FILE: &str = "y_train.json";
pub const X_TEST_FILE: &str = "X_test.json";
pub const Y_TEST_FILE: &str = "y_test.json";
pub const FEATURE_MEANS_FILE: &str = "feature_means.json";

pub const ARTIFACT_FILES: [&str; 6] = [
    SCALER_FILE,
    X_TRAIN_FILE,
    Y_TRAIN_FILE,
    X_TEST_FILE,
    Y_TEST_FILE,
    FEATURE_MEANS_FILE,
];

/// Таблица признаков (без масштабирования)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub index: Vec<usize>,
    pub data: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn from_partition(partition: &Partition) -> Self {
        Self {
            columns: partition.feature_names(),
            index: partition.index.clone(),
            data: partition
                .records()
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.data.len()
    }

    pub fn to_array(&self) -> Result<Array2<f64>> {
        let width = self.columns.len();
        if let Some(row) = self.data.iter().find(|row| row.len() != width) {
            return Err(PipelineError::ShapeMismatch {
                expected: width,
                found: row.len(),
            });
        }

        let flat: Vec<f64> = self.data.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.data.len(), width), flat).map_err(|_| PipelineError::ShapeMismatch {
            expected: width,
            found: self.data.first().map_or(0, Vec::len),
        })
    }
}

/// Метки классов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSeries {
    pub name: String,
    pub index: Vec<usize>,
    pub values: Vec<usize>,
}

impl LabelSeries {
    pub fn from_partition(partition: &Partition) -> Self {
        Self {
            name: TARGET_COLUMN.to_string(),
            index: partition.index.clone(),
            values: partition.targets().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_array(&self) -> Array1<usize> {
        Array1::from(self.values.clone())
    }
}

/// Полный набор артефактов одного запуска
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub dir: PathBuf,
    pub scaler: StandardScaler,
    pub x_train: FeatureTable,
    pub y_train: LabelSeries,
    pub x_test: FeatureTable,
    pub y_test: LabelSeries,
    pub feature_means: Vec<(String, f64)>,
}

impl ArtifactSet {
    pub fn new(dir: impl Into<PathBuf>, scaler: &StandardScaler, split: &Split) -> Result<Self> {
        Ok(Self {
            dir: dir.into(),
            scaler: scaler.clone(),
            x_train: FeatureTable::from_partition(&split.train),
            y_train: LabelSeries::from_partition(&split.train),
            x_test: FeatureTable::from_partition(&split.test),
            y_test: LabelSeries::from_partition(&split.test),
            feature_means: scaler.feature_means()?,
        })
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        ARTIFACT_FILES.iter().map(|name| self.dir.join(name)).collect()
    }

    fn means_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.feature_means
            .iter()
            .map(|(name, mean)| (name.clone(), serde_json::Value::from(*mean)))
            .collect()
    }

    fn write_all(&self, dir: &Path) -> Result<()> {
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(X_TRAIN_FILE), &self.x_train)?;
        write_json(&dir.join(Y_TRAIN_FILE), &self.y_train)?;
        write_json(&dir.join(X_TEST_FILE), &self.x_test)?;
        write_json(&dir.join(Y_TEST_FILE), &self.y_test)?;
        write_json(&dir.join(FEATURE_MEANS_FILE), &self.means_object())?;
        Ok(())
    }
}

/// Записывает шесть артефактов в `artifact_dir`, заменяя предыдущий набор.
/// Остальные файлы каталога не трогаются.
pub fn persist(artifact_dir: impl AsRef<Path>, scaler: &StandardScaler, split: &Split) -> Result<ArtifactSet> {
    let target = artifact_dir.as_ref();
    let artifacts = ArtifactSet::new(target, scaler, split)?;

    fs::create_dir_all(target).map_err(|e| PipelineError::io("create directory", target, e))?;

    let staging = tempfile::Builder::new()
        .prefix(".artifacts-staging-")
        .tempdir_in(target)
        .map_err(|e| PipelineError::io("create staging directory in", target, e))?;
    artifacts.write_all(staging.path())?;

    let backup = tempfile::Builder::new()
        .prefix(".artifacts-previous-")
        .tempdir_in(target)
        .map_err(|e| PipelineError::io("create backup directory in", target, e))?;
    if let Err(err) = publish(staging.path(), target, backup.path()) {
        // Невосстановленные файлы остаются в backup
        let unrestored = fs::read_dir(backup.path()).map_or(false, |mut entries| entries.next().is_some());
        if unrestored {
            let kept = backup.into_path();
            tracing::error!("Previous artifacts left in {}", kept.display());
        }
        return Err(err);
    }

    // staging уже пуст, backup держит предыдущий набор до drop
    drop(staging);
    drop(backup);

    tracing::info!("Published {} artifacts to {}", ARTIFACT_FILES.len(), target.display());
    Ok(artifacts)
}

/// Переносит файлы набора из `staged` в `target`.
/// При ошибке прежний набор возвращается на место.
fn publish(staged: &Path, target: &Path, backup: &Path) -> Result<()> {
    let mut moved_aside = Vec::new();
    for name in ARTIFACT_FILES {
        let current = target.join(name);
        if !current.exists() {
            continue;
        }
        if let Err(err) = fs::rename(&current, backup.join(name)) {
            restore(target, backup, &moved_aside, &[]);
            return Err(PipelineError::io("move aside", &current, err));
        }
        moved_aside.push(name);
    }

    let mut published = Vec::new();
    for name in ARTIFACT_FILES {
        let dest = target.join(name);
        if let Err(err) = fs::rename(staged.join(name), &dest) {
            restore(target, backup, &moved_aside, &published);
            return Err(PipelineError::io("publish", &dest, err));
        }
        published.push(name);
    }

    Ok(())
}

fn restore(target: &Path, backup: &Path, moved_aside: &[&str], published: &[&str]) {
    for name in published {
        let path = target.join(name);
        if let Err(err) = fs::remove_file(&path) {
            tracing::error!("Failed to remove partially published {}: {}", path.display(), err);
        }
    }
    for name in moved_aside {
        if let Err(err) = fs::rename(backup.join(name), target.join(name)) {
            tracing::error!(
                "Failed to restore previous {} from {}: {}",
                name,
                backup.display(),
                err
            );
        }
    }
}

/// Читает опубликованный набор артефактов
pub fn load_artifacts(artifact_dir: impl AsRef<Path>) -> Result<ArtifactSet> {
    let dir = artifact_dir.as_ref();
    if let Some(missing) = ARTIFACT_FILES.iter().find(|name| !dir.join(name).is_file()) {
        return Err(PipelineError::IncompleteArtifacts {
            dir: dir.to_path_buf(),
            missing: missing.to_string(),
        });
    }

    let means_path = dir.join(FEATURE_MEANS_FILE);
    let means: serde_json::Map<String, serde_json::Value> = read_json(&means_path)?;
    let feature_means = means
        .into_iter()
        .map(|(name, value)| match value.as_f64() {
            Some(mean) => Ok((name, mean)),
            None => Err(PipelineError::Serialization {
                path: means_path.clone(),
                source: serde::de::Error::custom(format!("mean of {name:?} is not a number: {value}")),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ArtifactSet {
        dir: dir.to_path_buf(),
        scaler: read_json(&dir.join(SCALER_FILE))?,
        x_train: read_json(&dir.join(X_TRAIN_FILE))?,
        y_train: read_json(&dir.join(Y_TRAIN_FILE))?,
        x_test: read_json(&dir.join(X_TEST_FILE))?,
        y_test: read_json(&dir.join(Y_TEST_FILE))?,
        feature_means,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| PipelineError::io("create", path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| PipelineError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| PipelineError::io("write", path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| PipelineError::io("sync", path, e))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| PipelineError::io("open", path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| PipelineError::Serialization {
        path: path.to_path_buf(),
        source,
    })
}
