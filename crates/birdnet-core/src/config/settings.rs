//! Root configuration for BirdNET tooling
//!
//! Stored as YAML. Default location: `<user cache dir>/birdnet/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::paths::default_checkpoints_dir;
use super::preprocessing::PreprocessingConfig;
use crate::provision::DeploymentMode;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parameters that shape extracted training tensors
    pub preprocessing: PreprocessingConfig,
    /// Model checkpoint location and download behaviour
    pub model: ModelConfig,
    /// Where fatal errors are recorded
    pub error_log: ErrorLogConfig,
}

/// Model provisioning section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory that model releases unpack into
    pub checkpoints_dir: PathBuf,
    /// `bundled` when assets ship inside the distribution
    pub deployment: DeploymentMode,
    /// Connect and read timeout for the archive download
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            checkpoints_dir: default_checkpoints_dir(),
            deployment: DeploymentMode::Source,
            timeout_secs: 30,
        }
    }
}

/// Error log section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogConfig {
    pub path: PathBuf,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("error_log.txt"),
        }
    }
}
