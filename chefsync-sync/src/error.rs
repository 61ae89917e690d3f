//! Error types for chefsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use chefsync_core::ConfigError;

/// All errors that can arise from building snapshots or reconciling a server.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A cookbook manifest could not be loaded. No partial snapshot is usable.
    #[error("failed to read cookbook {cookbook}: {reason}")]
    ArtifactRead { cookbook: String, reason: String },

    /// A converge step (delete, upload, create) failed; the rest of the plan is abandoned.
    #[error("{action} failed: {source}")]
    Action {
        action: String,
        #[source]
        source: Box<SyncError>,
    },

    /// A data bag item or object file is missing a field the server needs.
    #[error("invalid object file {path}: {reason}")]
    InvalidObject { path: PathBuf, reason: String },

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::ArtifactRead`].
pub(crate) fn read_err(cookbook: impl Into<String>, reason: impl ToString) -> SyncError {
    SyncError::ArtifactRead {
        cookbook: cookbook.into(),
        reason: reason.to_string(),
    }
}
