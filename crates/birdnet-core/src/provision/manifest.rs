//! Model releases and their file manifests

use std::path::{Path, PathBuf};

/// Ordered list of files, relative to the release directory, that must all
/// exist for a release to count as installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelManifest {
    files: &'static [&'static str],
}

impl ModelManifest {
    pub const fn new(files: &'static [&'static str]) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &'static [&'static str] {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// First manifest entry under `root` for which `exists` returns false
    ///
    /// Entries are checked in order, stopping at the first miss.
    pub fn first_missing_by<F>(&self, root: &Path, mut exists: F) -> Option<&'static str>
    where
        F: FnMut(&Path) -> bool,
    {
        self.files
            .iter()
            .copied()
            .find(|file| !exists(&root.join(file)))
    }

    /// First manifest entry missing from the filesystem under `root`
    pub fn first_missing(&self, root: &Path) -> Option<&'static str> {
        self.first_missing_by(root, Path::exists)
    }
}

/// A downloadable model release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRelease {
    /// Release tag, also the top-level directory inside the archive
    pub version: &'static str,
    pub archive_url: &'static str,
    pub manifest: ModelManifest,
}

impl ModelRelease {
    /// Directory the manifest is rooted at
    pub fn root(&self, checkpoints_dir: &Path) -> PathBuf {
        checkpoints_dir.join(self.version)
    }

    /// File name the archive is stored under while it is unpacked
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.version)
    }
}

/// Check that every manifest file exists under `root`
///
/// Stops at the first missing file and logs it.
pub fn verify(root: &Path, manifest: &ModelManifest) -> bool {
    match manifest.first_missing(root) {
        Some(file) => {
            log::info!("Model file missing: {}", file);
            false
        }
        None => {
            log::debug!("All {} model files found under {:?}", manifest.len(), root);
            true
        }
    }
}

const V2_4_FILES: &[&str] = &[
    "BirdNET_GLOBAL_6K_V2.4_Model/variables/variables.data-00000-of-00001",
    "BirdNET_GLOBAL_6K_V2.4_Model/variables/variables.index",
    "BirdNET_GLOBAL_6K_V2.4_Model/saved_model.pb",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard1of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard2of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard3of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard4of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard5of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard6of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard7of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/group1-shard8of8.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/mdata/model.json",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard1of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard2of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard3of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard4of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard5of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard6of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard7of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard8of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard9of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard10of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard11of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard12of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/group1-shard13of13.bin",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/model.json",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/model/labels.json",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/main.js",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/static/sample.wav",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/templates/index.html",
    "BirdNET_GLOBAL_6K_V2.4_Model_TFJS/app.py",
    "BirdNET_GLOBAL_6K_V2.4_Labels.txt",
    "BirdNET_GLOBAL_6K_V2.4_MData_Model_V2_FP16.tflite",
    "BirdNET_GLOBAL_6K_V2.4_Model_FP16.tflite",
    "BirdNET_GLOBAL_6K_V2.4_Model_FP32.tflite",
    "BirdNET_GLOBAL_6K_V2.4_Model_INT8.tflite",
];

/// BirdNET GLOBAL 6K V2.4: SavedModel, TFJS (main and metadata model) and
/// TFLite FP16/FP32/INT8 variants
pub const BIRDNET_V2_4: ModelRelease = ModelRelease {
    version: "V2.4",
    archive_url: "https://tuc.cloud/index.php/s/3BsizWy5M7CtQ5w/download/V2.4.zip",
    manifest: ModelManifest::new(V2_4_FILES),
};
