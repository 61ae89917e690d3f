//! Directory-backed server store.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   cookbooks/<name>/manifest.json      raw entries, each with a download url
//!   cookbooks/<name>/files/<relpath>    uploaded content
//!   data_bags/<bag>/<id>.json
//!   roles/<file>
//!   environments/<file>
//! ```
//!
//! Manifest and item writes use the `.tmp` + rename pattern.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use chefsync_core::{CookbookManifest, CookbookName};

use crate::checksum::ManifestSource;
use crate::error::{io_err, read_err, SyncError};
use crate::local::{list_files, list_subdirs, LocalCookbooks};
use crate::store::{CookbookStore, DataBagStore, ObjectStore};

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct DirectoryServer {
    root: PathBuf,
    server_url: String,
}

impl DirectoryServer {
    pub fn new(root: impl Into<PathBuf>, server_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Paths — pure, no I/O
    // -----------------------------------------------------------------------

    fn cookbooks_dir(&self) -> PathBuf {
        self.root.join("cookbooks")
    }

    fn cookbook_dir(&self, name: &CookbookName) -> PathBuf {
        self.cookbooks_dir().join(name.0.as_str())
    }

    fn data_bag_dir(&self, bag: &str) -> Result<PathBuf, SyncError> {
        let dir = self.root.join("data_bags");
        checked_name("data bag name", bag, &dir)?;
        Ok(dir.join(bag))
    }

    fn file_url(&self, name: &CookbookName, checksum: &str) -> String {
        format!("{}/cookbooks/{name}/files/{checksum}", self.server_url)
    }

    // -----------------------------------------------------------------------
    // Cookbook upload
    // -----------------------------------------------------------------------

    fn upload_one(&self, local: &LocalCookbooks, name: &CookbookName) -> Result<(), SyncError> {
        let mut manifest = local.load_manifest(name)?;
        let target = self.cookbook_dir(name);
        if target.exists() {
            fs::remove_dir_all(&target).map_err(|e| io_err(&target, e))?;
        }

        let source = local.cookbook_dir(name);
        for entry in manifest.segments.values_mut().flatten() {
            let from = source.join(&entry.name);
            let to = target.join("files").join(&entry.name);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            fs::copy(&from, &to).map_err(|e| io_err(&from, e))?;

            entry.url = Some(self.file_url(name, &entry.checksum));
            entry.path = Some(entry.name.clone());
            entry.full_path = Some(to.display().to_string());
        }

        write_json_atomic(&target.join(MANIFEST_FILE), &manifest)?;
        tracing::info!("uploaded cookbook {name} ({} files)", manifest.file_count());
        Ok(())
    }
}

impl ManifestSource for DirectoryServer {
    fn cookbook_names(&self) -> Result<Vec<CookbookName>, SyncError> {
        let dir = self.cookbooks_dir();
        let names = list_subdirs(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(names.into_iter().map(CookbookName::from).collect())
    }

    fn load_manifest(&self, name: &CookbookName) -> Result<CookbookManifest, SyncError> {
        let path = self.cookbook_dir(name).join(MANIFEST_FILE);
        let contents = fs::read_to_string(&path)
            .map_err(|e| read_err(name.to_string(), format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| read_err(name.to_string(), format!("{}: {e}", path.display())))
    }
}

impl CookbookStore for DirectoryServer {
    fn upload_all(&self, cookbook_dir: &Path) -> Result<(), SyncError> {
        let local = LocalCookbooks::new(cookbook_dir);
        let names = local.cookbook_names()?;
        for name in &names {
            self.upload_one(&local, name)?;
        }
        Ok(())
    }

    fn upload(&self, cookbook_dir: &Path, names: &[CookbookName]) -> Result<(), SyncError> {
        let local = LocalCookbooks::new(cookbook_dir);
        for name in names {
            self.upload_one(&local, name)?;
        }
        Ok(())
    }

    fn delete(&self, name: &CookbookName) -> Result<(), SyncError> {
        let dir = self.cookbook_dir(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!("deleted cookbook {name}");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&dir, err)),
        }
    }

    fn delete_all(&self) -> Result<(), SyncError> {
        for name in self.cookbook_names()? {
            self.delete(&name)?;
        }
        Ok(())
    }
}

impl DataBagStore for DirectoryServer {
    fn data_bags(&self) -> Result<Vec<String>, SyncError> {
        let dir = self.root.join("data_bags");
        list_subdirs(&dir).map_err(|e| io_err(&dir, e))
    }

    fn create_data_bag(&self, bag: &str) -> Result<(), SyncError> {
        let dir = self.data_bag_dir(bag)?;
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        tracing::info!("created data bag {bag}");
        Ok(())
    }

    fn data_bag_item_from_file(&self, bag: &str, path: &Path) -> Result<(), SyncError> {
        let contents = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let item: Value = serde_json::from_str(&contents).map_err(|e| SyncError::InvalidObject {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if item_id(&item).is_none() {
            return Err(SyncError::InvalidObject {
                path: path.to_path_buf(),
                reason: "data bag item has no string \"id\"".to_string(),
            });
        }
        self.save_data_bag_item(bag, &item)
    }

    fn save_data_bag_item(&self, bag: &str, item: &Value) -> Result<(), SyncError> {
        let dir = self.data_bag_dir(bag)?;
        let Some(id) = item_id(item) else {
            return Err(SyncError::InvalidObject {
                path: dir,
                reason: "data bag item has no string \"id\"".to_string(),
            });
        };
        checked_name("data bag item id", id, &dir)?;
        if !dir.is_dir() {
            return Err(io_err(
                &dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "data bag does not exist"),
            ));
        }
        write_json_atomic(&dir.join(format!("{id}.json")), item)?;
        tracing::info!("saved data bag item {bag}/{id}");
        Ok(())
    }

    fn load_data_bag_item(&self, bag: &str, id: &str) -> Result<Option<Value>, SyncError> {
        let dir = self.data_bag_dir(bag)?;
        checked_name("data bag item id", id, &dir)?;
        let path = dir.join(format!("{id}.json"));
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

impl ObjectStore for DirectoryServer {
    fn role_from_file(&self, path: &Path) -> Result<(), SyncError> {
        self.store_object("roles", path)
    }

    fn environment_from_file(&self, path: &Path) -> Result<(), SyncError> {
        self.store_object("environments", path)
    }
}

impl DirectoryServer {
    fn store_object(&self, kind: &str, path: &Path) -> Result<(), SyncError> {
        let Some(file_name) = path.file_name() else {
            return Err(SyncError::InvalidObject {
                path: path.to_path_buf(),
                reason: "no file name".to_string(),
            });
        };
        let dir = self.root.join(kind);
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let target = dir.join(file_name);
        fs::copy(path, &target).map_err(|e| io_err(path, e))?;
        tracing::info!("stored {kind} object {}", target.display());
        Ok(())
    }

    /// Names of the stored role files.
    pub fn roles(&self) -> Result<Vec<String>, SyncError> {
        let dir = self.root.join("roles");
        list_files(&dir).map_err(|e| io_err(&dir, e))
    }

    /// Names of the stored environment files.
    pub fn environments(&self) -> Result<Vec<String>, SyncError> {
        let dir = self.root.join("environments");
        list_files(&dir).map_err(|e| io_err(&dir, e))
    }
}

/// Bag names and item ids are `[A-Za-z0-9_-]+`, so they never leave their directory.
fn checked_name(kind: &str, name: &str, dir: &Path) -> Result<(), SyncError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SyncError::InvalidObject {
            path: dir.to_path_buf(),
            reason: format!("invalid {kind} {name:?}: only [A-Za-z0-9_-] allowed"),
        })
    }
}

fn item_id(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Write `value` as pretty JSON to `<path>.tmp`, then rename onto `path`.
fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid store path")));
    };
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
