use std::path::PathBuf;

use thiserror::Error;

/// Error surface for lock acquisition and release.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder (or a previous run of ours) has the lock.
    #[error("{message}")]
    Unavailable {
        message: String,
        holder: String,
        held_for_secs: u64,
        /// The recorded holder is the current user.
        own: bool,
    },

    /// The lock is held but its record could not be read.
    #[error(
        "unable to get exclusive lock on {path}; holder unknown (unreadable lock record: {reason})"
    )]
    ContentionUnknown { path: PathBuf, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode lock record: {0}")]
    Record(#[from] serde_json::Error),
}

impl LockError {
    /// Whether this error means someone else holds the lock.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            LockError::Unavailable { .. } | LockError::ContentionUnknown { .. }
        )
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LockError {
    LockError::Io {
        path: path.into(),
        source,
    }
}
