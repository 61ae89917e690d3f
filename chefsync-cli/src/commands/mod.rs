pub mod diff;
pub mod init;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use chefsync_core::{config, SyncConfig};

/// Config stored under the operator's home directory.
pub(crate) fn load_config() -> Result<SyncConfig> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    config::load_at(&home).context("failed to load chefsync config")
}
