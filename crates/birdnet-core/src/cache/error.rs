//! Cache error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while saving or loading a cache archive
#[derive(Error, Debug)]
pub enum CacheError {
    /// Archive exists but cannot be parsed
    #[error("Cache archive {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Feature and label tensors of one split disagree on sample count
    #[error("{split} split has {features} feature rows but {labels} label rows")]
    ShapeMismatch {
        split: &'static str,
        features: usize,
        labels: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
