//! chefsync — reconcile a cookbook repository with its configuration server.
//!
//! # Usage
//!
//! ```text
//! chefsync init --server-url <url> --server-root <dir> [--vendor-dir <dir>] [--lockfile <path>]
//! chefsync sync [--restore | --why-run] [--yes]
//! chefsync diff [--json]
//! chefsync status [--json]
//! ```

mod commands;
mod git;
mod preflight;
mod reporter;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "chefsync",
    version,
    about = "Sync cookbooks, data bags, roles and environments to a chef server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.chefsync/config.yaml.
    Init(InitArgs),

    /// Reconcile the server with the local repository under the sync lock.
    Sync(SyncArgs),

    /// Show which cookbooks differ between the repository and the server.
    Diff(DiffArgs),

    /// Show the current lock holder and the last synced commit.
    Status(StatusArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
