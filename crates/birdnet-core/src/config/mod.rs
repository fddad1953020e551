//! Configuration for BirdNET training and model provisioning
//!
//! Configuration is passed explicitly to the cache and provisioning code
//! rather than read from process-wide state. This module provides:
//!
//! - Generic YAML config loading/saving
//! - Checkpoint and config path utilities
//! - Preprocessing parameters that determine cached tensor content
//!
//! # Usage
//!
//! ```ignore
//! use birdnet_core::config::{load_config, default_config_path, Config};
//!
//! let mut config: Config = load_config(&default_config_path("config.yaml"));
//! config.preprocessing.validate();
//! ```

mod io;
mod paths;
mod preprocessing;
mod settings;

pub use io::{load_config, save_config};
pub use paths::{default_checkpoints_dir, default_config_path, default_data_dir};
pub use preprocessing::{CropMode, PreprocessingConfig};
pub use settings::{Config, ErrorLogConfig, ModelConfig};
