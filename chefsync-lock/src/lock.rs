//! `SyncLock` — the right to run a sync against one server.
//!
//! ```text
//! Unlocked ──lock()──▶ verify ──▶ Locked ──unlock()──▶ Released
//!                         │
//!                         └──────▶ Advisory (locking disabled on this host)
//! ```
//!
//! Contention never waits: the second acquirer reads the holder's record,
//! reports who holds the lock and for how long, and fails with
//! [`LockError::Unavailable`].

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chefsync_core::Reporter;
use chrono::Utc;
use fs2::FileExt;

use crate::error::{io_err, LockError};
use crate::host::{looks_like_server, short_hostname};
use crate::record::LockRecord;

/// Who is asking for the lock, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockIdentity {
    pub server_hostname: String,
    pub local_hostname: String,
    pub user: String,
    pub branch: String,
}

/// Behaviour derived once from the identity at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// The remote host also looks like a server.
    pub announce: bool,
    /// Locking is effective for this run.
    pub lock: bool,
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
    /// Locking disabled on this host; the run proceeds unprotected.
    Advisory,
    Released,
}

pub struct SyncLock {
    lockfile: PathBuf,
    identity: LockIdentity,
    options: LockOptions,
    warning_delay: Duration,
    reporter: Arc<dyn Reporter>,
    handle: Option<File>,
    state: LockState,
}

impl SyncLock {
    pub fn new(
        lockfile: impl Into<PathBuf>,
        mut identity: LockIdentity,
        force: bool,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        identity.server_hostname = short_hostname(&identity.server_hostname).to_string();
        let options = LockOptions {
            announce: looks_like_server(&identity.server_hostname),
            lock: looks_like_server(&identity.local_hostname) || force,
            force,
        };
        Self {
            lockfile: lockfile.into(),
            identity,
            options,
            warning_delay: Duration::from_secs(5),
            reporter,
            handle: None,
            state: LockState::Unlocked,
        }
    }

    /// Pause applied after the "no locking" warning.
    pub fn with_warning_delay(mut self, delay: Duration) -> Self {
        self.warning_delay = delay;
        self
    }

    pub fn options(&self) -> LockOptions {
        self.options
    }

    pub fn locking_enabled(&self) -> bool {
        self.options.lock
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn lockfile(&self) -> &Path {
        &self.lockfile
    }

    pub fn identity(&self) -> &LockIdentity {
        &self.identity
    }

    /// Acquire the lock, or degrade to advisory mode off-server.
    ///
    /// # Errors
    ///
    /// [`LockError::Unavailable`] / [`LockError::ContentionUnknown`] when the
    /// lock is already held; the caller must not proceed with a sync.
    pub fn lock(&mut self) -> Result<(), LockError> {
        if self.handle.is_some() {
            return Ok(());
        }
        self.verify_lockable();
        if !self.options.lock {
            self.state = LockState::Advisory;
            return Ok(());
        }
        let file = self.procure_lock()?;
        self.handle = Some(file);
        self.state = LockState::Locked;
        Ok(())
    }

    /// Release the lock and delete the lockfile. A no-op when nothing is held.
    pub fn unlock(&mut self) -> Result<(), LockError> {
        let Some(file) = self.handle.take() else {
            if self.state == LockState::Advisory {
                self.state = LockState::Released;
            }
            return Ok(());
        };
        self.reporter.info("removing lockfile");
        self.state = LockState::Released;

        // Waiters that already opened this inode fail the identity check in
        // `acquire` once they get it.
        let removed = std::fs::remove_file(&self.lockfile);
        let released = FileExt::unlock(&file);
        drop(file);

        match removed {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&self.lockfile, err)),
        }
        released.map_err(|e| io_err(&self.lockfile, e))?;
        tracing::debug!("released lock {}", self.lockfile.display());
        Ok(())
    }

    /// Run `body` under the lock. The lock is released whether `body`
    /// succeeds or fails; a release failure is reported, not returned, when
    /// `body` already failed.
    pub fn with_lock<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<LockError>,
    {
        self.lock()?;
        let result = body();
        match (result, self.unlock()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release)) => Err(release.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release)) => {
                self.reporter
                    .warn(&format!("failed to release lock after error: {release}"));
                Err(err)
            }
        }
    }

    fn verify_lockable(&self) {
        if self.options.lock {
            return;
        }
        self.reporter.warn(
            "Please be careful, this looks to be running on a system other than a chef server. \
             As such, there will be *no* locking.",
        );
        if !self.warning_delay.is_zero() {
            std::thread::sleep(self.warning_delay);
        }
    }

    fn procure_lock(&self) -> Result<File, LockError> {
        self.reporter.info("trying to obtain exclusive lock...");
        let file = open_lockfile(&self.lockfile)?;
        self.acquire(file)
    }

    /// Lock an already opened lockfile handle and stamp our record into it.
    fn acquire(&self, mut file: File) -> Result<File, LockError> {
        if let Err(err) = file.try_lock_exclusive() {
            if !is_contended(&err) {
                return Err(io_err(&self.lockfile, err));
            }
            let contention = self.contention_error(&mut file);
            drop(file);
            self.reporter.fatal(&contention.to_string());
            return Err(contention);
        }

        // The previous holder unlinks the file before releasing, so the inode
        // we locked may no longer be the one at `lockfile`.
        if let Err(reason) = same_file(&file, &self.lockfile) {
            let _ = FileExt::unlock(&file);
            drop(file);
            let contention = LockError::ContentionUnknown {
                path: self.lockfile.clone(),
                reason,
            };
            self.reporter.fatal(&contention.to_string());
            return Err(contention);
        }

        let record = LockRecord::now(self.identity.user.clone());
        let json = record.to_json()?;
        file.set_len(0).map_err(|e| io_err(&self.lockfile, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| io_err(&self.lockfile, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| io_err(&self.lockfile, e))?;
        file.flush().map_err(|e| io_err(&self.lockfile, e))?;

        self.reporter.info("lock obtained");
        tracing::debug!(
            user = %self.identity.user,
            branch = %self.identity.branch,
            "holding {}",
            self.lockfile.display()
        );
        Ok(file)
    }

    fn contention_error(&self, file: &mut File) -> LockError {
        let mut contents = String::new();
        if let Err(err) = file.read_to_string(&mut contents) {
            return LockError::ContentionUnknown {
                path: self.lockfile.clone(),
                reason: err.to_string(),
            };
        }
        let record = match LockRecord::parse(&contents) {
            Ok(record) => record,
            Err(err) => {
                return LockError::ContentionUnknown {
                    path: self.lockfile.clone(),
                    reason: err.to_string(),
                }
            }
        };

        let held_for_secs = record.held_for_secs(Utc::now().timestamp());
        let holder = record.user.trim().to_string();
        let own = holder == self.identity.user;
        let message = if own {
            format!("according to lockfile you've had lock for {held_for_secs} second(s).")
        } else {
            format!(
                "unable to get exclusive lock, currently held by {holder} for {held_for_secs} second(s)"
            )
        };
        LockError::Unavailable {
            message,
            holder,
            held_for_secs,
            own,
        }
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.unlock() {
                tracing::warn!("failed to release lock on drop: {err}");
            }
        }
    }
}

fn open_lockfile(path: &Path) -> Result<File, LockError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path).map_err(|e| io_err(path, e))
}

/// Whether `file` is still the inode linked at `path`.
#[cfg(unix)]
fn same_file(file: &File, path: &Path) -> Result<(), String> {
    use std::os::unix::fs::MetadataExt;

    let held = file
        .metadata()
        .map_err(|e| format!("cannot stat locked handle: {e}"))?;
    let current = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err("lockfile was removed while acquiring the lock".to_string())
        }
        Err(err) => return Err(format!("cannot stat lockfile: {err}")),
    };
    if held.dev() == current.dev() && held.ino() == current.ino() {
        Ok(())
    } else {
        Err("lockfile was replaced while acquiring the lock".to_string())
    }
}

#[cfg(not(unix))]
fn same_file(_file: &File, path: &Path) -> Result<(), String> {
    if path.exists() {
        Ok(())
    } else {
        Err("lockfile was removed while acquiring the lock".to_string())
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
