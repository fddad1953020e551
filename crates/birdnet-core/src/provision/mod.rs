//! Model asset provisioning
//!
//! Makes sure a model release is unpacked under the checkpoint directory
//! before anything tries to run inference. A release is described by a
//! fixed manifest of relative paths; when any of them is missing, the
//! release archive is downloaded once, checked for completeness, unpacked
//! and deleted.
//!
//! ## Flow
//!
//! ```text
//! ensure()
//!   ├─ bundled deployment ──────────────▶ done (assets ship with the app)
//!   ├─ verify(manifest) ok ─────────────▶ done
//!   └─ fetch archive ─▶ <version>.zip.tmp
//!        ├─ status / size check failed ─▶ delete partial, DownloadIncomplete
//!        └─ rename ─▶ extract ─▶ delete archive ─▶ verify again
//! ```

mod error;
mod fetch;
mod manifest;
mod provisioner;

pub use error::{ProvisionError, Result};
pub use fetch::{ArchiveFetcher, DownloadTransfer, FetchResponse, HttpFetcher};
pub use manifest::{verify, ModelManifest, ModelRelease, BIRDNET_V2_4};
pub use provisioner::{DeploymentMode, ModelProvisioner, ProvisionOutcome};
