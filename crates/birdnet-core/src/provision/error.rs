//! Provisioning error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while provisioning model assets
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Server answered with a non-success status, or sent fewer bytes than
    /// it advertised
    #[error("Download of {url} incomplete: HTTP {status}, received {received} of {expected} bytes")]
    DownloadIncomplete {
        url: String,
        status: u16,
        expected: u64,
        received: u64,
    },

    /// A manifest file is still absent after the archive was unpacked
    #[error("Required model file missing after extraction: {path:?}")]
    AssetMissing { path: PathBuf },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to extract model archive: {0}")]
    Extract(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
