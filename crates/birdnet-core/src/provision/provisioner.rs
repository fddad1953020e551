//! Model provisioning entry point

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zip::result::ZipError;
use zip::ZipArchive;

use super::error::{ProvisionError, Result};
use super::fetch::{ArchiveFetcher, DownloadTransfer, HttpFetcher};
use super::manifest::{verify, ModelRelease, BIRDNET_V2_4};
use crate::config::ModelConfig;

/// How the application was distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Running from source; assets are fetched on demand
    #[default]
    Source,
    /// Self-contained build with assets embedded; provisioning is skipped
    Bundled,
}

/// What [`ModelProvisioner::ensure`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Bundled deployment, nothing checked
    Bundled,
    /// Every manifest file was already present
    AlreadyPresent,
    /// Archive was downloaded and unpacked
    Downloaded { bytes: u64 },
}

/// Ensures a model release exists under a checkpoint directory
pub struct ModelProvisioner<F = HttpFetcher> {
    checkpoints_dir: PathBuf,
    release: ModelRelease,
    deployment: DeploymentMode,
    fetcher: F,
    progress: Option<Box<dyn Fn(f32) + Send>>,
}

impl ModelProvisioner<HttpFetcher> {
    /// Provisioner for the default release with a 30 s network timeout
    pub fn new(checkpoints_dir: PathBuf) -> Self {
        Self::with_fetcher(
            checkpoints_dir,
            BIRDNET_V2_4,
            HttpFetcher::new(Duration::from_secs(30)),
        )
    }

    /// Provisioner for the default release configured from `config`
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::with_fetcher(
            config.checkpoints_dir.clone(),
            BIRDNET_V2_4,
            HttpFetcher::new(Duration::from_secs(config.timeout_secs)),
        )
        .deployment(config.deployment)
    }
}

impl<F: ArchiveFetcher> ModelProvisioner<F> {
    pub fn with_fetcher(checkpoints_dir: PathBuf, release: ModelRelease, fetcher: F) -> Self {
        Self {
            checkpoints_dir,
            release,
            deployment: DeploymentMode::Source,
            fetcher,
            progress: None,
        }
    }

    pub fn deployment(mut self, deployment: DeploymentMode) -> Self {
        self.deployment = deployment;
        self
    }

    /// Report download progress (0.0 to 1.0)
    pub fn with_progress(mut self, progress: Box<dyn Fn(f32) + Send>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Directory the release's manifest is rooted at
    pub fn model_dir(&self) -> PathBuf {
        self.release.root(&self.checkpoints_dir)
    }

    pub fn release(&self) -> &ModelRelease {
        &self.release
    }

    /// Check whether every manifest file is present
    pub fn is_installed(&self) -> bool {
        verify(&self.model_dir(), &self.release.manifest)
    }

    /// Make sure the release is installed, downloading it if needed
    ///
    /// Repeated calls after a successful install only re-check the manifest.
    /// Not safe to run from several processes against one directory at once.
    pub fn ensure(&self) -> Result<ProvisionOutcome> {
        if self.deployment == DeploymentMode::Bundled {
            log::debug!("Bundled deployment, skipping model check");
            return Ok(ProvisionOutcome::Bundled);
        }

        if self.is_installed() {
            log::info!("Model {} found at {:?}", self.release.version, self.model_dir());
            self.report(1.0);
            return Ok(ProvisionOutcome::AlreadyPresent);
        }

        fs::create_dir_all(&self.checkpoints_dir)?;

        let archive_path = self.checkpoints_dir.join(self.release.archive_name());
        let temp_path = archive_path.with_extension("zip.tmp");

        log::info!(
            "Downloading model {} from {}",
            self.release.version,
            self.release.archive_url
        );
        let transfer = match self.download(&temp_path) {
            Ok(transfer) => transfer,
            Err(e) => {
                fs::remove_file(&temp_path).ok();
                return Err(e);
            }
        };
        fs::rename(&temp_path, &archive_path)?;

        let extracted = match extract_archive(&archive_path, &self.checkpoints_dir) {
            Ok(count) => count,
            Err(e) => {
                fs::remove_file(&archive_path).ok();
                return Err(e);
            }
        };
        fs::remove_file(&archive_path)?;

        log::info!(
            "Extracted {} entries from {} ({} bytes)",
            extracted,
            self.release.archive_name(),
            transfer.received_bytes
        );

        let root = self.model_dir();
        if let Some(missing) = self.release.manifest.first_missing(&root) {
            return Err(ProvisionError::AssetMissing {
                path: root.join(missing),
            });
        }

        self.report(1.0);
        Ok(ProvisionOutcome::Downloaded {
            bytes: transfer.received_bytes,
        })
    }

    /// Stream the archive into `temp_path` and check the transfer
    fn download(&self, temp_path: &Path) -> Result<DownloadTransfer> {
        let url = self.release.archive_url;
        let mut response = self.fetcher.fetch(url)?;

        let mut transfer = DownloadTransfer::new(url, temp_path, response.content_length);
        if !response.is_success() {
            return Err(ProvisionError::DownloadIncomplete {
                url: url.to_string(),
                status: response.status,
                expected: transfer.expected_bytes,
                received: 0,
            });
        }

        transfer.stream(response.body.as_mut(), self.progress.as_deref())?;

        if !transfer.is_complete() {
            return Err(ProvisionError::DownloadIncomplete {
                url: url.to_string(),
                status: response.status,
                expected: transfer.expected_bytes,
                received: transfer.received_bytes,
            });
        }

        Ok(transfer)
    }

    fn report(&self, fraction: f32) {
        if let Some(cb) = &self.progress {
            cb(fraction);
        }
    }
}

/// Unpack every entry of a zip archive into `dest`, keeping nested paths
///
/// Returns the number of entries.
fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(extract_error)?;
    let count = archive.len();
    archive.extract(dest).map_err(extract_error)?;
    Ok(count)
}

fn extract_error(e: ZipError) -> ProvisionError {
    match e {
        ZipError::Io(io) => ProvisionError::Io(io),
        other => ProvisionError::Extract(other.to_string()),
    }
}
