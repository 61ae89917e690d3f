//! `chefsync sync` — reconcile the server with the repository under the sync lock.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use chefsync_core::{CookbookName, Reporter, SyncConfig};
use chefsync_lock::{host, LockIdentity, SyncLock};
use chefsync_sync::{
    metadata, AlteredCookbooks, Converge, DirectoryServer, IgnoreList, RepoLayout, SyncError,
    SyncRun,
};

use crate::git::{GitInspector, SourceControl};
use crate::preflight::{AssumeYes, Confirmer, Preflight, Prompt};
use crate::reporter::ConsoleReporter;

/// Arguments for `chefsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Delete every cookbook on the server before re-uploading all of them.
    #[arg(long, short = 'r', conflicts_with = "why_run")]
    pub restore: bool,

    /// Report what would change without touching the server.
    #[arg(long, short = 'W')]
    pub why_run: bool,

    /// Accept every pre-sync confirmation.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Take the lock even on a host that does not look like a chef server.
    #[arg(long, hide = true)]
    pub force_lock: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter);
        let converge = Converge::new(self.why_run, Arc::clone(&reporter));
        let server = DirectoryServer::new(&config.server_root, &config.server_url);
        let ignore = IgnoreList::load(&config.ignore_file_path(), &config.repo_dir(), &*reporter)
            .context("failed to load ignore file")?;

        let cwd = std::env::current_dir().context("cannot resolve current directory")?;
        let git = GitInspector::new(&cwd);
        let branch = git.current_branch();

        if self.restore {
            reporter.warn("chefsync sync will delete and reupload all cookbooks!");
        }

        if converge.why_run() {
            reporter.info("Would perform pre-sync checks");
        } else {
            let preflight = Preflight {
                vendor_dir: config.vendor_dir.clone(),
                standard_vendor_dir: cwd.join("vendor"),
                standard_branch: config.standard_branch.clone(),
                branch: branch.clone(),
                local_commit: git.local_commit(&config.standard_branch),
                origin_commit: git.remote_commit(
                    "origin",
                    &config.standard_branch,
                    config.origin_timeout(),
                ),
            };
            let confirmer: &dyn Confirmer = if self.yes { &AssumeYes } else { &Prompt };
            preflight.confirm(confirmer)?;
        }

        let identity = LockIdentity {
            server_hostname: config.server_hostname()?,
            local_hostname: host::local_hostname(),
            user: config.user(),
            branch: branch.clone().unwrap_or_else(|| "unknown".to_string()),
        };
        let mut lock = SyncLock::new(
            &config.lockfile,
            identity,
            self.force_lock,
            Arc::clone(&reporter),
        )
        .with_warning_delay(config.lock_warning_delay());
        let altered = lock
            .with_lock(|| {
                run_locked(&config, &server, &converge, &ignore, &git, self.restore).map_err(
                    |err| {
                        let err = anyhow::Error::from(err);
                        reporter.warn(&format!("sync failed: {err:#}"));
                        err
                    },
                )
            })
            .context("sync failed")?;
        print_summary(&altered, converge.why_run());
        Ok(())
    }
}

/// Everything that mutates the server. Runs inside `SyncLock::with_lock`.
///
/// The recorded marker is the standard branch's commit, whatever is checked out.
fn run_locked(
    config: &SyncConfig,
    server: &DirectoryServer,
    converge: &Converge,
    ignore: &IgnoreList,
    git: &dyn SourceControl,
    restore: bool,
) -> Result<AlteredCookbooks, SyncError> {
    let run = SyncRun::new(RepoLayout::from_config(config), server, converge, ignore);
    if restore {
        run.restore()?;
    }
    let altered = run.run()?;

    let Some(local) = git.local_commit(&config.standard_branch) else {
        converge
            .reporter()
            .warn("unable to determine the local commit, not recording it");
        return Ok(altered);
    };
    let previous = metadata::last_synced_commit(server)?;
    converge.reporter().info(&format!(
        "updating commit from {} => {local}",
        previous.as_deref().unwrap_or("none")
    ));
    metadata::record_commit(server, converge, &local)?;
    Ok(altered)
}

fn print_summary(altered: &AlteredCookbooks, why_run: bool) {
    let prefix = if why_run { "[why-run] " } else { "" };
    if altered.is_empty() {
        println!("{prefix}✓ cookbooks already in sync");
        return;
    }
    println!(
        "{prefix}✓ cookbooks synced ({} added, {} updated, {} deleted)",
        altered.added.len(),
        altered.updated.len(),
        altered.deleted.len()
    );
    print_names("+", &altered.added);
    print_names("~", &altered.updated);
    print_names("-", &altered.deleted);
}

fn print_names(marker: &str, names: &[CookbookName]) {
    for name in names {
        println!("  {marker}  {name}");
    }
}
