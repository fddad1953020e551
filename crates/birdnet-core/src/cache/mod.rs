//! Training-data cache
//!
//! Persists extracted training and test tensors together with their labels
//! and the preprocessing parameters that produced them, so later runs can
//! skip feature extraction.
//!
//! ## Archive layout
//!
//! ```text
//! cache.zip
//! ├── x_train.npy          f32 [samples, features]
//! ├── y_train.npy          f32 [samples, classes]
//! ├── x_test.npy           (absent in old caches)
//! ├── y_test.npy           (absent in old caches)
//! ├── labels.json          ["Turdus merula_Common Blackbird", 3, ...]
//! └── preprocessing.json   snapshot; any field may be absent
//! ```
//!
//! A snapshot that differs from the current configuration produces a
//! [`CacheStaleWarning`]. The cached data is still returned.

mod archive;
mod bundle;
mod error;
mod manager;
mod staleness;

pub use archive::{CacheV1, CacheV2, StoredCache};
pub use bundle::{CacheBundle, Label, LoadedCache, PreprocessingSnapshot};
pub use error::{CacheError, Result};
pub use manager::{load_cache, save_cache};
pub use staleness::{CacheStaleWarning, SnapshotMismatch};
