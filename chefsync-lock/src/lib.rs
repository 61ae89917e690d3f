//! # chefsync-lock
//!
//! Cross-process advisory lock guarding a sync run against one server.
//!
//! Acquisition is exclusive and non-blocking: a contending process fails
//! immediately with the current holder and how long they have held the lock.
//! Locking only has teeth on a host that looks like the server owning the
//! lockfile; elsewhere the run degrades to unlocked after a warning.

mod error;
pub mod host;
mod lock;
pub mod record;

pub use error::LockError;
pub use lock::{LockIdentity, LockOptions, LockState, SyncLock};
pub use record::LockRecord;
