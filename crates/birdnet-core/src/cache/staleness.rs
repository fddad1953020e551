//! Staleness detection for cache archives
//!
//! Staleness is advisory. Re-extracting training tensors is expensive, so a
//! cache built with different preprocessing parameters is still used; the
//! caller only gets a warning describing the difference.

use std::fmt;

use super::bundle::PreprocessingSnapshot;
use crate::config::PreprocessingConfig;

/// One preprocessing field whose cached value differs from the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMismatch {
    pub field: &'static str,
    pub cached: String,
    pub current: String,
}

/// Cache was built with preprocessing parameters that no longer match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStaleWarning {
    pub mismatches: Vec<SnapshotMismatch>,
}

impl CacheStaleWarning {
    /// Compare a recorded snapshot against the current configuration
    ///
    /// Only the fields that shape tensor content are compared, using exact
    /// equality. Classification flags are returned with the data instead.
    pub fn check(snapshot: &PreprocessingSnapshot, current: &PreprocessingConfig) -> Option<Self> {
        let mut mismatches = Vec::new();

        let mut compare = |field: &'static str, cached: String, now: String, equal: bool| {
            if !equal {
                mismatches.push(SnapshotMismatch {
                    field,
                    cached,
                    current: now,
                });
            }
        };

        compare(
            "fmin",
            snapshot.fmin.to_string(),
            current.bandpass_fmin.to_string(),
            snapshot.fmin == current.bandpass_fmin,
        );
        compare(
            "fmax",
            snapshot.fmax.to_string(),
            current.bandpass_fmax.to_string(),
            snapshot.fmax == current.bandpass_fmax,
        );
        compare(
            "audio_speed",
            snapshot.audio_speed.to_string(),
            current.audio_speed.to_string(),
            snapshot.audio_speed == current.audio_speed,
        );
        compare(
            "crop_mode",
            snapshot.crop_mode.to_string(),
            current.sample_crop_mode.to_string(),
            snapshot.crop_mode == current.sample_crop_mode,
        );
        compare(
            "overlap",
            snapshot.overlap.to_string(),
            current.sig_overlap.to_string(),
            snapshot.overlap == current.sig_overlap,
        );

        if mismatches.is_empty() {
            None
        } else {
            Some(Self { mismatches })
        }
    }

    /// Names of the differing fields, in comparison order
    pub fn fields(&self) -> Vec<&'static str> {
        self.mismatches.iter().map(|m| m.field).collect()
    }
}

impl fmt::Display for CacheStaleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cache preprocessing parameters don't match current settings")?;
        for m in &self.mismatches {
            write!(f, "; {}: cache={} current={}", m.field, m.cached, m.current)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CropMode;

    #[test]
    fn test_matching_snapshot_is_not_stale() {
        let config = PreprocessingConfig::default();
        assert!(CacheStaleWarning::check(&config.snapshot(), &config).is_none());
    }

    #[test]
    fn test_classification_flags_are_not_compared() {
        let config = PreprocessingConfig::default();
        let mut snapshot = config.snapshot();
        snapshot.binary_classification = true;
        snapshot.multi_label = true;
        assert!(CacheStaleWarning::check(&snapshot, &config).is_none());
    }

    #[test]
    fn test_reports_each_differing_field() {
        let cached = PreprocessingConfig::default().snapshot();
        let current = PreprocessingConfig {
            bandpass_fmax: 11000.0,
            sample_crop_mode: CropMode::First,
            ..Default::default()
        };

        let warning = CacheStaleWarning::check(&cached, &current).unwrap();
        assert_eq!(warning.fields(), vec!["fmax", "crop_mode"]);
        assert_eq!(warning.mismatches[1].cached, "center");
        assert_eq!(warning.mismatches[1].current, "first");

        let message = warning.to_string();
        assert!(message.contains("fmax: cache=15000 current=11000"));
    }
}
