//! ReconciliationPlanner — turns a local/remote classification into an
//! ordered plan and executes it through a [`CookbookStore`].
//!
//! ## Plan
//!
//! 1. Remote empty → upload every local cookbook in one batch.
//! 2. Otherwise delete `stale ∪ updated`, then upload `new ∪ updated`,
//!    names sorted. A changed cookbook is replaced whole.
//!
//! The first failing step aborts the rest of the plan.

use std::path::Path;

use serde::Serialize;

use chefsync_core::CookbookName;

use crate::checksum::{ChecksumIndex, ManifestSource};
use crate::converge::Converge;
use crate::diff::Classification;
use crate::error::SyncError;
use crate::store::CookbookStore;

/// Which cookbooks a run changed on the server. Every list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlteredCookbooks {
    pub added: Vec<CookbookName>,
    pub deleted: Vec<CookbookName>,
    pub updated: Vec<CookbookName>,
}

impl AlteredCookbooks {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }
}

pub struct Planner<'a> {
    local: &'a dyn ManifestSource,
    server: &'a dyn CookbookStore,
    cookbook_dir: &'a Path,
    converge: &'a Converge,
}

impl<'a> Planner<'a> {
    /// `cookbook_dir` is where `server` uploads from; normally the directory
    /// `local` reads.
    pub fn new(
        local: &'a dyn ManifestSource,
        server: &'a dyn CookbookStore,
        cookbook_dir: &'a Path,
        converge: &'a Converge,
    ) -> Self {
        Self {
            local,
            server,
            cookbook_dir,
            converge,
        }
    }

    /// Build both snapshots and classify them without changing anything.
    pub fn classify(&self) -> Result<Classification, SyncError> {
        let index = ChecksumIndex::new(self.converge.reporter());
        let remote = index.build_snapshot(self.server)?;
        let local = index.build_snapshot_against(self.local, &remote)?;
        Ok(Classification::classify(&local, &remote))
    }

    /// Execute the plan. The report is the same in why-run mode.
    pub fn run(&self) -> Result<AlteredCookbooks, SyncError> {
        let mut remote_names = self.server.cookbook_names()?;
        remote_names.sort();

        if remote_names.is_empty() {
            return self.bootstrap();
        }

        let plan = self.classify()?;
        let to_delete = plan.to_delete();
        let to_upload = plan.to_upload();
        tracing::info!(
            "plan: {} new, {} stale, {} updated, {} unchanged",
            plan.new.len(),
            plan.stale.len(),
            plan.updated.len(),
            plan.unchanged.len()
        );

        for name in &to_delete {
            self.converge
                .converge_by(&format!("Delete cookbook {name}"), || self.server.delete(name))?;
        }
        if !to_upload.is_empty() {
            self.converge
                .converge_by(&format!("Upload cookbooks {}", join(&to_upload)), || {
                    self.server.upload(self.cookbook_dir, &to_upload)
                })?;
        }

        Ok(AlteredCookbooks {
            added: plan.new,
            deleted: plan.stale,
            updated: plan.updated,
        })
    }

    /// Empty server: one batch upload, no per-cookbook diffing.
    fn bootstrap(&self) -> Result<AlteredCookbooks, SyncError> {
        let mut added = self.local.cookbook_names()?;
        added.sort();
        added.dedup();
        self.converge.converge_by("Upload all cookbooks", || {
            self.server.upload_all(self.cookbook_dir)
        })?;
        Ok(AlteredCookbooks {
            added,
            ..AlteredCookbooks::default()
        })
    }
}

fn join(names: &[CookbookName]) -> String {
    names
        .iter()
        .map(|n| n.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
