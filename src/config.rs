/// Настройки запуска пайплайна

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::preprocessing::split::{DEFAULT_SEED, DEFAULT_TEST_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    #[serde(default = "default_test_size")]
    pub test_size: f64, // доля test, 0..1
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_input_path() -> PathBuf { PathBuf::from("data").join("UCI_Credit_Card.xls") }
fn default_artifact_dir() -> PathBuf { PathBuf::from("artifacts") }
fn default_test_size() -> f64 { DEFAULT_TEST_SIZE }
fn default_seed() -> u64 { DEFAULT_SEED }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            artifact_dir: default_artifact_dir(),
            test_size: default_test_size(),
            seed: default_seed(),
        }
    }
}

impl PipelineConfig {
    pub fn new(input_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            artifact_dir: artifact_dir.into(),
            ..Self::default()
        }
    }

    /// Загрузка из JSON-файла; отсутствующие поля берутся по умолчанию
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::io("open", path, e))?;
        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            PipelineError::Serialization {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.artifact_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("artifact_dir is empty".to_string()));
        }
        Ok(())
    }
}
