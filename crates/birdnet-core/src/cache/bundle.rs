//! Cache data types

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{CacheError, Result};
use super::staleness::CacheStaleWarning;
use crate::config::CropMode;

/// A label identifier
///
/// Label lists may mix species names with numeric class ids, so each entry
/// keeps its own type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Text(value)
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Integer(value)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Integer(v) => write!(f, "{}", v),
            Label::Float(v) => write!(f, "{}", v),
            Label::Text(v) => f.write_str(v),
        }
    }
}

/// Preprocessing parameters recorded with a cache archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSnapshot {
    pub binary_classification: bool,
    pub multi_label: bool,
    pub fmin: f64,
    pub fmax: f64,
    pub audio_speed: f64,
    pub crop_mode: CropMode,
    pub overlap: f64,
}

/// Training and test tensors handed to the cache for persistence
///
/// Rows are samples. `x_*` rows hold embeddings, `y_*` rows hold the
/// (multi-hot) targets.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheBundle {
    pub x_train: Array2<f32>,
    pub y_train: Array2<f32>,
    pub x_test: Array2<f32>,
    pub y_test: Array2<f32>,
    pub labels: Vec<Label>,
}

impl CacheBundle {
    /// Create a bundle, checking that each split has as many targets as samples
    pub fn new(
        x_train: Array2<f32>,
        y_train: Array2<f32>,
        x_test: Array2<f32>,
        y_test: Array2<f32>,
        labels: Vec<Label>,
    ) -> Result<Self> {
        let bundle = Self {
            x_train,
            y_train,
            x_test,
            y_test,
            labels,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Create a bundle without a test split
    pub fn train_only(x_train: Array2<f32>, y_train: Array2<f32>, labels: Vec<Label>) -> Result<Self> {
        Self::new(x_train, y_train, empty_split(), empty_split(), labels)
    }

    /// Check the parallel-length invariant of both splits
    pub fn validate(&self) -> Result<()> {
        check_split("train", &self.x_train, &self.y_train)?;
        check_split("test", &self.x_test, &self.y_test)
    }

    pub fn train_len(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn test_len(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Result of loading a cache archive
#[derive(Debug, Clone)]
pub struct LoadedCache {
    pub x_train: Array2<f32>,
    pub y_train: Array2<f32>,
    pub x_test: Array2<f32>,
    pub y_test: Array2<f32>,
    pub labels: Vec<Label>,
    pub binary_classification: bool,
    pub multi_label: bool,
    /// Recorded preprocessing parameters; `None` for caches written before
    /// they were stored
    pub snapshot: Option<PreprocessingSnapshot>,
    /// Set when the recorded parameters differ from the current configuration
    pub stale: Option<CacheStaleWarning>,
}

impl LoadedCache {
    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }

    /// Drop the metadata and keep the tensors
    pub fn into_bundle(self) -> CacheBundle {
        CacheBundle {
            x_train: self.x_train,
            y_train: self.y_train,
            x_test: self.x_test,
            y_test: self.y_test,
            labels: self.labels,
        }
    }
}

/// An empty `(0, 0)` split
pub(crate) fn empty_split() -> Array2<f32> {
    Array2::zeros((0, 0))
}

pub(crate) fn check_split(split: &'static str, x: &Array2<f32>, y: &Array2<f32>) -> Result<()> {
    if x.nrows() != y.nrows() {
        return Err(CacheError::ShapeMismatch {
            split,
            features: x.nrows(),
            labels: y.nrows(),
        });
    }
    Ok(())
}
