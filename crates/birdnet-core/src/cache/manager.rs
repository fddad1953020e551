//! Save and load training caches

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use super::archive::StoredCache;
use super::bundle::{CacheBundle, LoadedCache};
use super::error::Result;
use super::staleness::CacheStaleWarning;
use crate::config::PreprocessingConfig;

/// Save training data to a cache archive
///
/// The preprocessing snapshot is taken from `config` at call time. Parent
/// directories are created as needed. The archive is written to a temporary
/// file next to `path` and renamed into place, so `path` only ever holds a
/// complete archive. Concurrent writers to one path still race on the rename.
pub fn save_cache(path: &Path, bundle: &CacheBundle, config: &PreprocessingConfig) -> Result<()> {
    bundle.validate()?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    StoredCache::write(temp.as_file_mut(), bundle, &config.snapshot())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    log::info!(
        "Saved training cache {:?} ({} train / {} test samples, {} labels)",
        path,
        bundle.train_len(),
        bundle.test_len(),
        bundle.labels.len()
    );
    Ok(())
}

/// Load training data from a cache archive
///
/// A snapshot that differs from `config` is logged and reported through
/// [`LoadedCache::stale`]; the data is returned either way. Archives without
/// a snapshot are assumed valid.
pub fn load_cache(path: &Path, config: &PreprocessingConfig) -> Result<LoadedCache> {
    let file = File::open(path)?;
    let stored = StoredCache::read(BufReader::new(file), path)?;

    let (bundle, snapshot, binary_classification, multi_label) = stored.normalize();

    let stale = snapshot
        .as_ref()
        .and_then(|snapshot| CacheStaleWarning::check(snapshot, config));
    if let Some(warning) = &stale {
        log::warn!("{:?}: {}", path, warning);
    }

    log::info!(
        "Loaded training cache {:?} ({} train / {} test samples)",
        path,
        bundle.train_len(),
        bundle.test_len()
    );

    Ok(LoadedCache {
        x_train: bundle.x_train,
        y_train: bundle.y_train,
        x_test: bundle.x_test,
        y_test: bundle.y_test,
        labels: bundle.labels,
        binary_classification,
        multi_label,
        snapshot,
        stale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, Label};
    use crate::config::CropMode;
    use ndarray::{array, Array2};

    fn sample_bundle() -> CacheBundle {
        CacheBundle::new(
            array![[0.1f32, 0.2, 0.3], [0.4, 0.5, 0.6], [0.7, 0.8, 0.9]],
            array![[1.0f32, 0.0], [0.0, 1.0], [1.0, 1.0]],
            array![[1.5f32, 2.5, 3.5]],
            array![[0.0f32, 1.0]],
            vec![
                Label::from("Cyanistes caeruleus_Eurasian Blue Tit"),
                Label::from(42i64),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train_cache.npz");
        let config = PreprocessingConfig {
            multi_label: true,
            bandpass_fmin: 250.0,
            sample_crop_mode: CropMode::Segments,
            sig_overlap: 1.25,
            ..Default::default()
        };
        let bundle = sample_bundle();

        save_cache(&path, &bundle, &config).unwrap();
        let loaded = load_cache(&path, &config).unwrap();

        assert!(!loaded.is_stale());
        assert!(loaded.multi_label);
        assert!(!loaded.binary_classification);
        assert_eq!(loaded.snapshot, Some(config.snapshot()));
        assert_eq!(loaded.into_bundle(), bundle);
    }

    #[test]
    fn test_long_decimal_settings_roundtrip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.npz");

        for k in 0..200u32 {
            let config = PreprocessingConfig {
                bandpass_fmin: 1.0 / 3.0 + k as f64,
                bandpass_fmax: 9397.143242699281 + k as f64 * 0.1234567891234567,
                audio_speed: 1.0 / (1.0 + k as f64),
                sig_overlap: 2.0 / 7.0,
                ..Default::default()
            };

            save_cache(&path, &sample_bundle(), &config).unwrap();
            let loaded = load_cache(&path, &config).unwrap();

            assert!(!loaded.is_stale(), "stale for k={}: {:?}", k, loaded.stale);
            assert_eq!(loaded.snapshot, Some(config.snapshot()));
        }
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("cache.npz");

        save_cache(&path, &sample_bundle(), &PreprocessingConfig::default()).unwrap();

        assert!(path.is_file());
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_changed_config_warns_but_returns_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.npz");
        let saved_with = PreprocessingConfig::default();
        let bundle = sample_bundle();
        save_cache(&path, &bundle, &saved_with).unwrap();

        let current = PreprocessingConfig {
            audio_speed: 0.5,
            sig_overlap: 2.0,
            ..Default::default()
        };
        let loaded = load_cache(&path, &current).unwrap();

        let warning = loaded.stale.clone().expect("cache should be flagged stale");
        assert_eq!(warning.fields(), vec!["audio_speed", "overlap"]);
        assert_eq!(loaded.snapshot, Some(saved_with.snapshot()));
        assert_eq!(loaded.into_bundle(), bundle);
    }

    #[test]
    fn test_overwrite_keeps_only_new_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.npz");
        let config = PreprocessingConfig::default();

        save_cache(&path, &sample_bundle(), &config).unwrap();
        let smaller =
            CacheBundle::train_only(Array2::ones((1, 3)), Array2::ones((1, 2)), vec![Label::from(1i64)])
                .unwrap();
        save_cache(&path, &smaller, &config).unwrap();

        let loaded = load_cache(&path, &config).unwrap();
        assert_eq!(loaded.x_train.nrows(), 1);
        assert_eq!(loaded.labels, vec![Label::Integer(1)]);
    }

    #[test]
    fn test_save_rejects_invalid_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.npz");
        let bundle = CacheBundle {
            x_train: Array2::zeros((2, 3)),
            y_train: Array2::zeros((1, 2)),
            x_test: Array2::zeros((0, 0)),
            y_test: Array2::zeros((0, 0)),
            labels: vec![],
        };

        let result = save_cache(&path, &bundle, &PreprocessingConfig::default());
        assert!(matches!(result, Err(CacheError::ShapeMismatch { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_cache(&dir.path().join("absent.npz"), &PreprocessingConfig::default());
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn test_load_truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.npz");
        save_cache(&path, &sample_bundle(), &PreprocessingConfig::default()).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let result = load_cache(&path, &PreprocessingConfig::default());
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }
}
