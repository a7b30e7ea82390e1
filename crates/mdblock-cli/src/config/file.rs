use crate::error::{CliError, Result};
use mdblock::core::params::{Platform, Precision};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub simulation: Option<FileSimulationConfig>,
    pub environment: Option<FileEnvironmentConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSimulationConfig {
    pub md_steps: Option<u64>,
    pub md_save_interval: Option<u64>,
    pub platform_name: Option<Platform>,
    pub platform_precision: Option<Precision>,
    pub starting_state_path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEnvironmentConfig {
    /// An empty string disables the runner.
    pub runner: Option<String>,
    pub conda_env: Option<String>,
    pub worker: Option<PathBuf>,
    pub worker_args: Option<Vec<String>>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
