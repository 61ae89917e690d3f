//! Last-synced commit marker, kept as data bag item `metadata/commit`.
//!
//! Provenance only; reconciliation never reads it.

use serde_json::json;

use crate::converge::Converge;
use crate::error::SyncError;
use crate::store::DataBagStore;

pub const METADATA_BAG: &str = "metadata";
pub const COMMIT_ITEM: &str = "commit";

/// The commit recorded by the last successful sync, if any.
pub fn last_synced_commit(store: &dyn DataBagStore) -> Result<Option<String>, SyncError> {
    if !store.data_bags()?.iter().any(|bag| bag == METADATA_BAG) {
        return Ok(None);
    }
    let item = store.load_data_bag_item(METADATA_BAG, COMMIT_ITEM)?;
    Ok(item
        .as_ref()
        .and_then(|item| item.get("commit"))
        .and_then(|commit| commit.as_str())
        .map(str::to_string))
}

/// Record `commit` as the server's baseline, creating the metadata bag if needed.
pub fn record_commit(
    store: &dyn DataBagStore,
    converge: &Converge,
    commit: &str,
) -> Result<(), SyncError> {
    if !store.data_bags()?.iter().any(|bag| bag == METADATA_BAG) {
        converge.converge_by("create data bag metadata", || {
            store.create_data_bag(METADATA_BAG)
        })?;
    }
    let item = json!({ "id": COMMIT_ITEM, "commit": commit });
    converge.converge_by("update commit", || {
        store.save_data_bag_item(METADATA_BAG, &item)
    })
}
