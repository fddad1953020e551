//! Cache archive container
//!
//! A cache is a zip file of NumPy `.npy` members plus two JSON members. Older
//! writers omitted the test split and the preprocessing record, so every
//! member except `x_train`, `y_train` and `labels` is optional on read. The
//! decoded archive is tagged by format version and normalised before use.

use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::bundle::{check_split, empty_split, CacheBundle, Label, PreprocessingSnapshot};
use super::error::{CacheError, Result};
use crate::config::CropMode;

const X_TRAIN: &str = "x_train.npy";
const Y_TRAIN: &str = "y_train.npy";
const X_TEST: &str = "x_test.npy";
const Y_TEST: &str = "y_test.npy";
const LABELS: &str = "labels.json";
const PREPROCESSING: &str = "preprocessing.json";

/// Preprocessing member as stored; any field may be missing
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    binary_classification: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multi_label: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fmin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fmax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crop_mode: Option<CropMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overlap: Option<f64>,
}

impl From<&PreprocessingSnapshot> for SnapshotRecord {
    fn from(s: &PreprocessingSnapshot) -> Self {
        Self {
            binary_classification: Some(s.binary_classification),
            multi_label: Some(s.multi_label),
            fmin: Some(s.fmin),
            fmax: Some(s.fmax),
            audio_speed: Some(s.audio_speed),
            crop_mode: Some(s.crop_mode),
            overlap: Some(s.overlap),
        }
    }
}

impl SnapshotRecord {
    /// Complete snapshot, if every compared field was recorded
    fn complete(&self) -> Option<PreprocessingSnapshot> {
        Some(PreprocessingSnapshot {
            binary_classification: self.binary_classification.unwrap_or(false),
            multi_label: self.multi_label.unwrap_or(false),
            fmin: self.fmin?,
            fmax: self.fmax?,
            audio_speed: self.audio_speed?,
            crop_mode: self.crop_mode?,
            overlap: self.overlap?,
        })
    }
}

/// Archive without a complete preprocessing record
#[derive(Debug, Clone)]
pub struct CacheV1 {
    pub x_train: Array2<f32>,
    pub y_train: Array2<f32>,
    pub labels: Vec<Label>,
    /// `(x_test, y_test)` when the writer already stored a test split
    pub test: Option<(Array2<f32>, Array2<f32>)>,
    pub binary_classification: Option<bool>,
    pub multi_label: Option<bool>,
}

/// Archive with tensors, labels and the full preprocessing snapshot
#[derive(Debug, Clone)]
pub struct CacheV2 {
    pub bundle: CacheBundle,
    pub snapshot: PreprocessingSnapshot,
}

/// A decoded cache archive, tagged by format version
#[derive(Debug, Clone)]
pub enum StoredCache {
    V1(CacheV1),
    V2(CacheV2),
}

impl StoredCache {
    /// Decode an archive from any seekable reader
    ///
    /// `path` is only used for error messages.
    pub fn read<R: Read + Seek>(reader: R, path: &Path) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(|e| corrupt(path, e))?;

        let x_train = require(read_array(&mut archive, X_TRAIN, path)?, X_TRAIN, path)?;
        let y_train = require(read_array(&mut archive, Y_TRAIN, path)?, Y_TRAIN, path)?;
        let labels: Vec<Label> = require(read_json(&mut archive, LABELS, path)?, LABELS, path)?;

        let test = match (
            read_array(&mut archive, X_TEST, path)?,
            read_array(&mut archive, Y_TEST, path)?,
        ) {
            (Some(x), Some(y)) => Some((x, y)),
            (None, None) => None,
            _ => return Err(corrupt(path, "test split is missing one of x_test/y_test")),
        };

        check_split("train", &x_train, &y_train).map_err(|e| corrupt(path, e))?;
        if let Some((x, y)) = &test {
            check_split("test", x, y).map_err(|e| corrupt(path, e))?;
        }

        let record: SnapshotRecord = read_json(&mut archive, PREPROCESSING, path)?.unwrap_or_default();

        match record.complete() {
            Some(snapshot) => {
                let (x_test, y_test) = test.unwrap_or_else(|| (empty_split(), empty_split()));
                Ok(StoredCache::V2(CacheV2 {
                    bundle: CacheBundle {
                        x_train,
                        y_train,
                        x_test,
                        y_test,
                        labels,
                    },
                    snapshot,
                }))
            }
            None => {
                log::debug!("Cache {:?} has no complete preprocessing record", path);
                Ok(StoredCache::V1(CacheV1 {
                    x_train,
                    y_train,
                    labels,
                    test,
                    binary_classification: record.binary_classification,
                    multi_label: record.multi_label,
                }))
            }
        }
    }

    /// Encode a bundle with its snapshot in the current format
    pub fn write<W: Write + Seek>(
        writer: W,
        bundle: &CacheBundle,
        snapshot: &PreprocessingSnapshot,
    ) -> Result<W> {
        let mut zip = ZipWriter::new(writer);

        write_array(&mut zip, X_TRAIN, &bundle.x_train)?;
        write_array(&mut zip, Y_TRAIN, &bundle.y_train)?;
        write_array(&mut zip, X_TEST, &bundle.x_test)?;
        write_array(&mut zip, Y_TEST, &bundle.y_test)?;
        write_json(&mut zip, LABELS, &bundle.labels)?;
        write_json(&mut zip, PREPROCESSING, &SnapshotRecord::from(snapshot))?;

        zip.finish().map_err(io::Error::other).map_err(CacheError::from)
    }

    pub fn snapshot(&self) -> Option<&PreprocessingSnapshot> {
        match self {
            StoredCache::V1(_) => None,
            StoredCache::V2(v2) => Some(&v2.snapshot),
        }
    }

    /// Upgrade to the current shape: missing test splits become empty and
    /// missing classification flags become `false`
    ///
    /// Returns the tensors, the recorded snapshot (if any) and the
    /// `(binary_classification, multi_label)` flags.
    pub fn normalize(self) -> (CacheBundle, Option<PreprocessingSnapshot>, bool, bool) {
        match self {
            StoredCache::V1(v1) => {
                let (x_test, y_test) = v1.test.unwrap_or_else(|| (empty_split(), empty_split()));
                let bundle = CacheBundle {
                    x_train: v1.x_train,
                    y_train: v1.y_train,
                    x_test,
                    y_test,
                    labels: v1.labels,
                };
                (
                    bundle,
                    None,
                    v1.binary_classification.unwrap_or(false),
                    v1.multi_label.unwrap_or(false),
                )
            }
            StoredCache::V2(v2) => {
                let binary = v2.snapshot.binary_classification;
                let multi = v2.snapshot.multi_label;
                (v2.bundle, Some(v2.snapshot), binary, multi)
            }
        }
    }
}

fn corrupt(path: &Path, reason: impl ToString) -> CacheError {
    CacheError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn require<T>(value: Option<T>, member: &str, path: &Path) -> Result<T> {
    value.ok_or_else(|| corrupt(path, format!("missing member {}", member)))
}

fn read_array<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    path: &Path,
) -> Result<Option<Array2<f32>>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(corrupt(path, format!("{}: {}", name, e))),
    };
    Array2::<f32>::read_npy(entry)
        .map(Some)
        .map_err(|e| corrupt(path, format!("{}: {}", name, e)))
}

fn read_json<R: Read + Seek, T: DeserializeOwned>(
    archive: &mut ZipArchive<R>,
    name: &str,
    path: &Path,
) -> Result<Option<T>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(corrupt(path, format!("{}: {}", name, e))),
    };
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|e| corrupt(path, format!("{}: {}", name, e)))?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| corrupt(path, format!("{}: {}", name, e)))
}

fn member_options(size_hint: usize) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(size_hint >= u32::MAX as usize)
}

fn write_array<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, array: &Array2<f32>) -> Result<()> {
    let size_hint = array.len() * std::mem::size_of::<f32>();
    zip.start_file(name, member_options(size_hint))
        .map_err(io::Error::other)?;
    array.write_npy(&mut *zip).map_err(io::Error::other)?;
    Ok(())
}

fn write_json<W: Write + Seek, T: Serialize>(zip: &mut ZipWriter<W>, name: &str, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value).map_err(io::Error::other)?;
    zip.start_file(name, member_options(json.len()))
        .map_err(io::Error::other)?;
    zip.write_all(&json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Cursor;

    fn legacy_archive(members: &[&str], record: Option<&str>) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let x = array![[1.0f32, 2.0], [3.0, 4.0]];
        let y = array![[1.0f32], [0.0]];
        for &name in members {
            let data = if name.starts_with('x') { &x } else { &y };
            write_array(&mut zip, name, data).unwrap();
        }
        write_json(&mut zip, LABELS, &vec![Label::from("Erithacus rubecula_European Robin")]).unwrap();
        if let Some(json) = record {
            zip.start_file(PREPROCESSING, member_options(0)).unwrap();
            zip.write_all(json.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_current_format_reads_as_v2() {
        let bundle = CacheBundle::train_only(
            array![[0.5f32, 0.25]],
            array![[1.0f32]],
            vec![Label::from("Sturnus vulgaris_European Starling")],
        )
        .unwrap();
        let snapshot = crate::config::PreprocessingConfig::default().snapshot();

        let bytes = StoredCache::write(Cursor::new(Vec::new()), &bundle, &snapshot)
            .unwrap()
            .into_inner();
        let stored = StoredCache::read(Cursor::new(bytes), Path::new("mem")).unwrap();

        assert_eq!(stored.snapshot(), Some(&snapshot));
        let (loaded, _, binary, multi) = stored.normalize();
        assert_eq!(loaded, bundle);
        assert!(!binary && !multi);
    }

    #[test]
    fn test_archive_without_test_split_reads_as_v1() {
        let bytes = legacy_archive(&[X_TRAIN, Y_TRAIN], None);
        let stored = StoredCache::read(Cursor::new(bytes), Path::new("old.npz")).unwrap();

        match &stored {
            StoredCache::V1(v1) => {
                assert!(v1.test.is_none());
                assert_eq!(v1.binary_classification, None);
            }
            StoredCache::V2(_) => panic!("Expected legacy archive"),
        }

        let (bundle, snapshot, binary, multi) = stored.normalize();
        assert!(snapshot.is_none());
        assert_eq!(bundle.x_test.nrows(), 0);
        assert_eq!(bundle.y_test.nrows(), 0);
        assert!(!binary && !multi);
    }

    #[test]
    fn test_partial_record_is_treated_as_legacy() {
        let record = r#"{"multi_label": true, "fmin": 0.0, "fmax": 15000.0}"#;
        let bytes = legacy_archive(&[X_TRAIN, Y_TRAIN, X_TEST, Y_TEST], Some(record));
        let stored = StoredCache::read(Cursor::new(bytes), Path::new("partial")).unwrap();

        assert!(stored.snapshot().is_none());
        let (bundle, _, binary, multi) = stored.normalize();
        assert_eq!(bundle.test_len(), 2);
        assert!(!binary);
        assert!(multi);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let result = StoredCache::read(Cursor::new(b"not a zip file".to_vec()), Path::new("bad"));
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_missing_labels_is_corrupt() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        write_array(&mut zip, X_TRAIN, &array![[1.0f32]]).unwrap();
        write_array(&mut zip, Y_TRAIN, &array![[1.0f32]]).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        match StoredCache::read(Cursor::new(bytes), Path::new("nolabels")) {
            Err(CacheError::Corrupt { reason, .. }) => assert!(reason.contains("labels.json")),
            other => panic!("Expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_half_test_split_is_corrupt() {
        let bytes = legacy_archive(&[X_TRAIN, Y_TRAIN, X_TEST], None);
        let result = StoredCache::read(Cursor::new(bytes), Path::new("half"));
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }
}
