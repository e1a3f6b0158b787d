//! Credit default ML - подготовка датасета

pub mod artifacts;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod preprocessing;
pub mod schema;
pub mod types;

pub use types::*;
pub use preprocessing::*;

// Re-export для удобства
pub use artifacts::{load_artifacts, persist, ArtifactSet};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{prepare, run, PipelineReport, PreparedData};
