//! Collaborator seams between the planner and a server.
//!
//! The planner and publishers only see these traits; [`crate::DirectoryServer`]
//! is the implementation shipped with the binary, and tests substitute
//! recording fakes.

use std::path::Path;

use serde_json::Value;

use chefsync_core::CookbookName;

use crate::checksum::ManifestSource;
use crate::error::SyncError;

/// Whole-cookbook upload and delete. There is no partial patching: a changed
/// cookbook is deleted and uploaded again.
pub trait CookbookStore: ManifestSource {
    /// Upload every cookbook found under `cookbook_dir` in one batch.
    fn upload_all(&self, cookbook_dir: &Path) -> Result<(), SyncError>;

    /// Upload the named cookbooks from `cookbook_dir` in one batch.
    fn upload(&self, cookbook_dir: &Path, names: &[CookbookName]) -> Result<(), SyncError>;

    fn delete(&self, name: &CookbookName) -> Result<(), SyncError>;

    /// Remove every cookbook on the server.
    fn delete_all(&self) -> Result<(), SyncError>;
}

/// Data bags and their JSON items.
pub trait DataBagStore {
    fn data_bags(&self) -> Result<Vec<String>, SyncError>;

    fn create_data_bag(&self, bag: &str) -> Result<(), SyncError>;

    /// Publish the JSON item stored at `path` into `bag`. The item's `id`
    /// field names it.
    fn data_bag_item_from_file(&self, bag: &str, path: &Path) -> Result<(), SyncError>;

    fn save_data_bag_item(&self, bag: &str, item: &Value) -> Result<(), SyncError>;

    /// `Ok(None)` when the bag or item does not exist.
    fn load_data_bag_item(&self, bag: &str, id: &str) -> Result<Option<Value>, SyncError>;
}

/// Roles and environments, published from their definition files.
pub trait ObjectStore {
    fn role_from_file(&self, path: &Path) -> Result<(), SyncError>;

    fn environment_from_file(&self, path: &Path) -> Result<(), SyncError>;
}

/// Everything a full sync talks to.
pub trait ChefServer: CookbookStore + DataBagStore + ObjectStore {}

impl<T: CookbookStore + DataBagStore + ObjectStore> ChefServer for T {}
