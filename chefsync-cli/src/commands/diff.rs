//! `chefsync diff` — classify every cookbook against the server. Read-only.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use chefsync_core::reporter::format_diff;
use chefsync_core::{CookbookName, TracingReporter};
use chefsync_sync::{Classification, Converge, DirectoryServer, LocalCookbooks, Planner};

/// Arguments for `chefsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "cookbook")]
    cookbook: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "differing files")]
    files: String,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let server = DirectoryServer::new(&config.server_root, &config.server_url);
        let local = LocalCookbooks::new(&config.vendor_dir);
        // Per-cookbook status lines go to the log; stdout carries the table or JSON.
        let converge = Converge::new(true, Arc::new(TracingReporter));

        let classification = Planner::new(&local, &server, &config.vendor_dir, &converge)
            .classify()
            .context("failed to compare cookbooks with the server")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&classification)
                    .context("failed to serialize diff JSON")?
            );
            return Ok(());
        }
        print_table(&classification);
        Ok(())
    }
}

fn print_table(classification: &Classification) {
    if classification.in_sync() {
        println!(
            "{} server matches {} cookbook(s)",
            "✓".green(),
            classification.unchanged.len()
        );
        return;
    }

    let mut rows = Vec::new();
    push_rows(&mut rows, &classification.new, "new", |_| "-".to_string());
    push_rows(&mut rows, &classification.updated, "updated", |name| {
        classification
            .diffs
            .get(name)
            .map(format_diff)
            .unwrap_or_default()
    });
    push_rows(&mut rows, &classification.stale, "stale", |_| "-".to_string());
    push_rows(&mut rows, &classification.unchanged, "unchanged", |_| {
        "-".to_string()
    });
    rows.sort_by(|a, b| a.cookbook.cmp(&b.cookbook));

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} to upload, {} to delete. Run 'chefsync sync' to reconcile.",
        classification.to_upload().len(),
        classification.to_delete().len()
    );
}

fn push_rows(
    rows: &mut Vec<DiffRow>,
    names: &[CookbookName],
    state: &str,
    files: impl Fn(&CookbookName) -> String,
) {
    rows.extend(names.iter().map(|name| DiffRow {
        cookbook: name.to_string(),
        state: state.to_string(),
        files: files(name),
    }));
}
