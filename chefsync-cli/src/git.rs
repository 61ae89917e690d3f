//! Source-control inspector backed by `git2`.
//!
//! Every query degrades to "unknown" (`None`) instead of failing: the answers
//! only feed operator confirmations.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use git2::{Cred, Direction, RemoteCallbacks, Repository};

pub trait SourceControl {
    /// Short name of the checked-out branch.
    fn current_branch(&self) -> Option<String>;

    /// Commit id `branch` points at locally.
    fn local_commit(&self, branch: &str) -> Option<String>;

    /// Commit id of `branch` on `remote`, or `None` on error or after `timeout`.
    fn remote_commit(&self, remote: &str, branch: &str, timeout: Duration) -> Option<String>;
}

/// Inspects the repository containing `path`.
#[derive(Debug, Clone)]
pub struct GitInspector {
    path: PathBuf,
}

impl GitInspector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Option<Repository> {
        Repository::discover(&self.path)
            .map_err(|e| tracing::debug!("no git repository at {}: {e}", self.path.display()))
            .ok()
    }
}

impl SourceControl for GitInspector {
    fn current_branch(&self) -> Option<String> {
        let repo = self.open()?;
        let head = repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(str::to_string)
    }

    fn local_commit(&self, branch: &str) -> Option<String> {
        let repo = self.open()?;
        let object = repo.revparse_single(branch).ok()?;
        let commit = object.peel_to_commit().ok()?;
        Some(commit.id().to_string())
    }

    fn remote_commit(&self, remote: &str, branch: &str, timeout: Duration) -> Option<String> {
        let (tx, rx) = mpsc::channel();
        let path = self.path.clone();
        let (remote, branch) = (remote.to_string(), branch.to_string());
        let worker_remote = remote.clone();

        // The worker is abandoned on timeout; it exits with the process.
        std::thread::spawn(move || {
            let _ = tx.send(ls_remote(&path, &worker_remote, &branch));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "timed out after {}s asking {remote} for its commit",
                    timeout.as_secs()
                );
                None
            }
        }
    }
}

fn ls_remote(path: &Path, remote: &str, branch: &str) -> Option<String> {
    let repo = Repository::discover(path).ok()?;
    let mut remote = repo.find_remote(remote).ok()?;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username, _allowed| {
        Cred::ssh_key_from_agent(username.unwrap_or("git"))
    });

    let connection = remote
        .connect_auth(Direction::Fetch, Some(callbacks), None)
        .map_err(|e| tracing::debug!("ls-remote failed: {e}"))
        .ok()?;
    let wanted = format!("refs/heads/{branch}");
    let heads = connection.list().ok()?;
    heads
        .iter()
        .find(|head| head.name() == wanted)
        .map(|head| head.oid().to_string())
}
