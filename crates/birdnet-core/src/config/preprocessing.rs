//! Preprocessing parameters
//!
//! These settings change the content of extracted training tensors, so every
//! cache archive records them and compares them on load.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cache::PreprocessingSnapshot;

/// Maximum signal overlap in seconds (segments are 3 s long)
const MAX_SIG_OVERLAP: f64 = 2.9;

/// How training samples longer than one segment are cropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    /// Take the segment centred in the sample
    #[default]
    Center,
    /// Take the first segment
    First,
    /// Split into overlapping segments
    Segments,
    /// Pick the segments with the strongest detections
    Smart,
}

impl CropMode {
    /// Tag stored in cache archives and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::First => "first",
            Self::Segments => "segments",
            Self::Smart => "smart",
        }
    }
}

impl fmt::Display for CropMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preprocessing configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Train a single positive-vs-background classifier
    pub binary_classification: bool,
    /// Allow several labels per sample
    pub multi_label: bool,
    /// Bandpass lower bound in Hz
    pub bandpass_fmin: f64,
    /// Bandpass upper bound in Hz
    pub bandpass_fmax: f64,
    /// Playback speed applied before extraction
    pub audio_speed: f64,
    /// Crop mode for long samples
    pub sample_crop_mode: CropMode,
    /// Overlap between consecutive segments in seconds
    pub sig_overlap: f64,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            binary_classification: false,
            multi_label: false,
            bandpass_fmin: 0.0,
            bandpass_fmax: 15000.0,
            audio_speed: 1.0,
            sample_crop_mode: CropMode::Center,
            sig_overlap: 0.0,
        }
    }
}

impl PreprocessingConfig {
    /// Validate and clamp values to ranges the extractor accepts
    pub fn validate(&mut self) {
        if self.audio_speed.is_nan() || self.audio_speed <= 0.0 {
            self.audio_speed = 1.0;
        }
        self.sig_overlap = self.sig_overlap.clamp(0.0, MAX_SIG_OVERLAP);
        self.bandpass_fmin = self.bandpass_fmin.max(0.0);
        if self.bandpass_fmin > self.bandpass_fmax {
            std::mem::swap(&mut self.bandpass_fmin, &mut self.bandpass_fmax);
        }
    }

    /// Record the current settings for storage alongside cached tensors
    pub fn snapshot(&self) -> PreprocessingSnapshot {
        PreprocessingSnapshot {
            binary_classification: self.binary_classification,
            multi_label: self.multi_label,
            fmin: self.bandpass_fmin,
            fmax: self.bandpass_fmax,
            audio_speed: self.audio_speed,
            crop_mode: self.sample_crop_mode,
            overlap: self.sig_overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps_overlap_and_speed() {
        let mut config = PreprocessingConfig {
            audio_speed: 0.0,
            sig_overlap: 5.0,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.audio_speed, 1.0);
        assert_eq!(config.sig_overlap, MAX_SIG_OVERLAP);
    }

    #[test]
    fn test_validate_swaps_inverted_band() {
        let mut config = PreprocessingConfig {
            bandpass_fmin: 8000.0,
            bandpass_fmax: 500.0,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.bandpass_fmin, 500.0);
        assert_eq!(config.bandpass_fmax, 8000.0);
    }

    #[test]
    fn test_snapshot_copies_every_field() {
        let config = PreprocessingConfig {
            binary_classification: true,
            multi_label: true,
            bandpass_fmin: 150.0,
            bandpass_fmax: 12000.0,
            audio_speed: 0.5,
            sample_crop_mode: CropMode::Smart,
            sig_overlap: 1.0,
        };
        let snapshot = config.snapshot();
        assert!(snapshot.binary_classification);
        assert!(snapshot.multi_label);
        assert_eq!(snapshot.fmin, 150.0);
        assert_eq!(snapshot.fmax, 12000.0);
        assert_eq!(snapshot.audio_speed, 0.5);
        assert_eq!(snapshot.crop_mode, CropMode::Smart);
        assert_eq!(snapshot.overlap, 1.0);
    }

    #[test]
    fn test_crop_mode_yaml_tag() {
        let yaml = serde_yaml::to_string(&CropMode::Segments).unwrap();
        assert_eq!(yaml.trim(), "segments");
        assert_eq!(CropMode::First.to_string(), "first");
    }
}
