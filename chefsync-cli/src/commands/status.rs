//! `chefsync status` — lock holder and last synced commit. Read-only.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use chefsync_lock::LockRecord;
use chefsync_sync::{metadata, DirectoryServer};

/// Arguments for `chefsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    server_url: String,
    lockfile: String,
    lock: Option<LockHolder>,
    last_synced_commit: Option<String>,
}

#[derive(Debug, Serialize)]
struct LockHolder {
    user: String,
    since: Option<String>,
    held_for_secs: u64,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let server = DirectoryServer::new(&config.server_root, &config.server_url);

        let record = LockRecord::read_at(&config.lockfile).with_context(|| {
            format!("failed to read lockfile '{}'", config.lockfile.display())
        })?;
        let now = Utc::now().timestamp();
        let lock = record.map(|record| LockHolder {
            since: DateTime::<Utc>::from_timestamp(record.ts, 0).map(|t| t.to_rfc3339()),
            held_for_secs: record.held_for_secs(now),
            user: record.user,
        });
        let last_synced_commit = metadata::last_synced_commit(&server)
            .context("failed to read the commit marker from the server")?;

        let report = StatusReport {
            server_url: config.server_url.clone(),
            lockfile: config.lockfile.display().to_string(),
            lock,
            last_synced_commit,
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &StatusReport) {
    println!(
        "chefsync v{} | {}",
        env!("CARGO_PKG_VERSION"),
        report.server_url
    );
    match &report.lock {
        Some(holder) => println!(
            "{} {} by {} for {} second(s)",
            "■".yellow().bold(),
            "LOCKED".yellow(),
            holder.user,
            holder.held_for_secs
        ),
        None => println!("{} {}", "■".green().bold(), "UNLOCKED".green()),
    }
    println!("  Lockfile: {}", report.lockfile);
    match &report.last_synced_commit {
        Some(commit) => println!("  Last synced commit: {commit}"),
        None => println!("  Last synced commit: {}", "never".bright_black()),
    }
}
