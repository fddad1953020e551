//! Standard locations for BirdNET data and configuration files

use std::path::PathBuf;

/// Get the default data directory
///
/// Returns: `<user cache dir>/birdnet` (e.g. `~/.cache/birdnet` on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("birdnet")
}

/// Get the default checkpoint directory that model releases unpack into
///
/// Returns: `<user cache dir>/birdnet/checkpoints`
pub fn default_checkpoints_dir() -> PathBuf {
    default_data_dir().join("checkpoints")
}

/// Get the default config file path
///
/// Returns: `<user cache dir>/birdnet/{filename}`
pub fn default_config_path(filename: &str) -> PathBuf {
    default_data_dir().join(filename)
}
