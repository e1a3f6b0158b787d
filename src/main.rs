/// CLI подготовки датасета

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use credit_default_ml::PipelineConfig;

#[derive(Parser)]
#[command(
    name = "credit-prep",
    version,
    about = "Prepare the credit default dataset: split, scale and save training artifacts"
)]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, value_name = "FILE", env = "CREDIT_PREP_CONFIG")]
    config: Option<PathBuf>,

    /// Input spreadsheet (.xls or .xlsx).
    #[arg(long, value_name = "PATH", env = "CREDIT_PREP_INPUT")]
    input: Option<PathBuf>,

    /// Directory that receives the artifact set.
    #[arg(long = "artifact-dir", value_name = "DIR", env = "CREDIT_PREP_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Test partition fraction.
    #[arg(long = "test-size", env = "CREDIT_PREP_TEST_SIZE")]
    test_size: Option<f64>,

    /// Random seed for the split.
    #[arg(long, env = "CREDIT_PREP_SEED")]
    seed: Option<u64>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(dir) = self.artifact_dir {
            config.artifact_dir = dir;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    tracing::debug!("Config: {:?}", config);

    let report = credit_default_ml::run(&config)
        .with_context(|| format!("preprocessing {}", config.input_path.display()))?;

    tracing::info!(
        "{} features, {} train / {} test rows",
        report.feature_names.len(),
        report.train_rows,
        report.test_rows
    );
    println!("Preprocessing complete. Artifacts saved in: {}", report.artifact_dir.display());
    Ok(())
}
