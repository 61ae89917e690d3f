//! Full sync run: cookbooks, then data bags, environments and roles.

use std::path::PathBuf;

use chefsync_core::SyncConfig;

use crate::converge::Converge;
use crate::error::SyncError;
use crate::ignore::IgnoreList;
use crate::local::LocalCookbooks;
use crate::planner::{AlteredCookbooks, Planner};
use crate::publish::Publisher;
use crate::store::ChefServer;

/// Repository locations a run reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    pub vendor_dir: PathBuf,
    pub data_bag_dir: PathBuf,
    pub environment_dir: PathBuf,
    pub role_dir: PathBuf,
}

impl RepoLayout {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            vendor_dir: config.vendor_dir.clone(),
            data_bag_dir: config.data_bag_dir(),
            environment_dir: config.environment_dir(),
            role_dir: config.role_dir(),
        }
    }
}

pub struct SyncRun<'a, S: ChefServer> {
    layout: RepoLayout,
    server: &'a S,
    converge: &'a Converge,
    ignore: &'a IgnoreList,
}

impl<'a, S: ChefServer> SyncRun<'a, S> {
    pub fn new(
        layout: RepoLayout,
        server: &'a S,
        converge: &'a Converge,
        ignore: &'a IgnoreList,
    ) -> Self {
        Self {
            layout,
            server,
            converge,
            ignore,
        }
    }

    /// Reconcile cookbooks, then publish everything else.
    pub fn run(&self) -> Result<AlteredCookbooks, SyncError> {
        let local = LocalCookbooks::new(&self.layout.vendor_dir);
        let altered =
            Planner::new(&local, self.server, &self.layout.vendor_dir, self.converge).run()?;

        let publisher = Publisher::new(self.server, self.server, self.converge, self.ignore);
        publisher.upload_data_bags(&self.layout.data_bag_dir)?;
        publisher.upload_environments(&self.layout.environment_dir)?;
        publisher.upload_roles(&self.layout.role_dir)?;
        Ok(altered)
    }

    /// Delete every cookbook on the server so the next run re-uploads all of them.
    pub fn restore(&self) -> Result<(), SyncError> {
        self.converge
            .converge_by("delete all existing cookbooks", || self.server.delete_all())
    }
}
