//! BirdNET Core - training-data cache and model asset provisioning
//!
//! 1. **Cache**: persist extracted training/test tensors together with the
//!    preprocessing parameters that produced them, and warn when a cache is
//!    loaded under different settings.
//!
//! 2. **Provisioning**: make sure a model release is unpacked under the
//!    checkpoint directory, downloading it once if any file is missing.

pub mod cache;
pub mod config;
pub mod error_log;
pub mod provision;

pub use cache::{load_cache, save_cache, CacheBundle, CacheError, LoadedCache};
pub use error_log::{run_logged, ErrorLog};
pub use provision::{ModelProvisioner, ProvisionError, ProvisionOutcome};
