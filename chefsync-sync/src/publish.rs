//! Publishing of data bags, environments and roles from the repository.
//!
//! Unlike cookbooks these are pushed wholesale on every run; the server
//! treats a re-published object as a replace. Every push is converge-gated.

use std::path::Path;

use crate::converge::Converge;
use crate::error::{io_err, SyncError};
use crate::ignore::IgnoreList;
use crate::local::{list_files, list_subdirs};
use crate::store::{DataBagStore, ObjectStore};

pub struct Publisher<'a> {
    data_bags: &'a dyn DataBagStore,
    objects: &'a dyn ObjectStore,
    converge: &'a Converge,
    ignore: &'a IgnoreList,
}

impl<'a> Publisher<'a> {
    pub fn new(
        data_bags: &'a dyn DataBagStore,
        objects: &'a dyn ObjectStore,
        converge: &'a Converge,
        ignore: &'a IgnoreList,
    ) -> Self {
        Self {
            data_bags,
            objects,
            converge,
            ignore,
        }
    }

    /// Publish every data bag under `dir`, creating bags the server lacks.
    pub fn upload_data_bags(&self, dir: &Path) -> Result<(), SyncError> {
        let reporter = self.converge.reporter();
        reporter.info("updating data bags in batch mode");

        let existing = self.data_bags.data_bags()?;
        for bag in list_subdirs(dir).map_err(|e| io_err(dir, e))? {
            let bag_path = dir.join(&bag);
            if self.ignore.is_ignored(&bag_path) {
                reporter.info(&format!("Ignored: {}", bag_path.display()));
                continue;
            }
            if !existing.contains(&bag) {
                self.converge.converge_by(&format!("Create data bag {bag}"), || {
                    self.data_bags.create_data_bag(&bag)
                })?;
            }
            for item in list_files(&bag_path).map_err(|e| io_err(&bag_path, e))? {
                let item_path = bag_path.join(item);
                if self.ignore.is_ignored(&item_path) {
                    tracing::debug!("ignored data bag item {}", item_path.display());
                    continue;
                }
                self.converge.converge_by(
                    &format!("Create data bag {bag} from {}", item_path.display()),
                    || self.data_bags.data_bag_item_from_file(&bag, &item_path),
                )?;
            }
        }
        Ok(())
    }

    /// Publish every regular file in `dir` as an environment.
    pub fn upload_environments(&self, dir: &Path) -> Result<(), SyncError> {
        for file in list_files(dir).map_err(|e| io_err(dir, e))? {
            let path = dir.join(file);
            self.converge
                .converge_by(&format!("Create environment from {}", path.display()), || {
                    self.objects.environment_from_file(&path)
                })?;
        }
        Ok(())
    }

    /// Publish every regular file in `dir` as a role.
    pub fn upload_roles(&self, dir: &Path) -> Result<(), SyncError> {
        for file in list_files(dir).map_err(|e| io_err(dir, e))? {
            let path = dir.join(file);
            self.converge
                .converge_by(&format!("Create role from {}", path.display()), || {
                    self.objects.role_from_file(&path)
                })?;
        }
        Ok(())
    }
}
