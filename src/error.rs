//! Ошибки пайплайна подготовки данных

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported file format {extension:?} for {path}: use .xls or .xlsx")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("target column not found in {path}: expected one of {candidates:?}")]
    MissingColumn {
        path: PathBuf,
        candidates: Vec<String>,
    },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode spreadsheet {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet {path} has no data")]
    EmptyDataset { path: PathBuf },

    #[error("column {column:?} row {row}: {value:?} is not numeric")]
    NonNumericFeature {
        column: String,
        row: usize,
        value: String,
    },

    #[error("row {row}: target value {value} is not 0 or 1")]
    InvalidTarget { row: usize, value: i64 },

    #[error("shape mismatch: expected {expected} features, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("scaler is not fitted")]
    NotFitted,

    #[error("failed to serialize {path}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact set in {dir} is incomplete: {missing} is missing")]
    IncompleteArtifacts { dir: PathBuf, missing: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
