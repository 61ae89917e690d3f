//! chefsync core library — manifest types, operator config, reporting.
//!
//! - [`types`] — cookbook names, manifest entries, snapshots, diff results
//! - [`config`] — `~/.chefsync/config.yaml` load / save
//! - [`reporter`] — the [`Reporter`] seam every component logs through
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod reporter;
pub mod types;

pub use config::SyncConfig;
pub use error::ConfigError;
pub use reporter::{MemoryReporter, Reporter, TracingReporter};
pub use types::{
    ChecksumSnapshot, CookbookManifest, CookbookName, DiffResult, ManifestEntry,
    RawManifestEntry, SegmentManifest,
};
