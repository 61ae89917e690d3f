//! `chefsync init --server-url <url> --server-root <dir> [--vendor-dir <dir>] ...`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use chefsync_core::{config, SyncConfig};

/// Write the operator config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// URL of the chef server (e.g. https://chef01.example.com/organizations/ops).
    #[arg(long)]
    pub server_url: String,

    /// Directory backing the server's object store.
    #[arg(long)]
    pub server_root: PathBuf,

    /// Vendored cookbooks. Defaults to `<cwd>/vendor`.
    #[arg(long)]
    pub vendor_dir: Option<PathBuf>,

    /// Advisory lockfile shared by every sync against this server.
    #[arg(long)]
    pub lockfile: Option<PathBuf>,

    /// Name recorded as the lock holder instead of the OS user.
    #[arg(long)]
    pub node_name: Option<String>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let cwd = std::env::current_dir().context("cannot resolve current directory")?;

        let vendor_dir = match self.vendor_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => cwd.join(dir),
            None => cwd.join("vendor"),
        };
        let mut cfg = SyncConfig::new(self.server_url, vendor_dir, self.server_root);
        cfg.server_hostname()
            .context("--server-url must name a host")?;
        if let Some(lockfile) = self.lockfile {
            cfg.lockfile = lockfile;
        }
        cfg.node_name = self.node_name;

        let path = config::save_at(&home, &cfg).context("failed to write config")?;
        println!("✓ Configured sync to '{}'", cfg.server_url);
        println!("  Vendor dir: {}", cfg.vendor_dir.display());
        println!("  Saved to: {}", path.display());
        Ok(())
    }
}
