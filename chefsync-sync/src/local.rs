//! Loader for the vendored cookbook directory.
//!
//! `<vendor_dir>/<cookbook>/…`: every non-hidden subdirectory is a cookbook;
//! every regular file in it becomes a manifest entry with a SHA-256 checksum,
//! filed under the segment its first path component names.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use chefsync_core::types::segment_for;
use chefsync_core::{CookbookManifest, CookbookName, RawManifestEntry};

use crate::checksum::ManifestSource;
use crate::error::{read_err, SyncError};

const LOCAL_SPECIFICITY: &str = "default";

/// Cookbooks vendored into a local directory.
#[derive(Debug, Clone)]
pub struct LocalCookbooks {
    vendor_dir: PathBuf,
}

impl LocalCookbooks {
    pub fn new(vendor_dir: impl Into<PathBuf>) -> Self {
        Self {
            vendor_dir: vendor_dir.into(),
        }
    }

    pub fn vendor_dir(&self) -> &Path {
        &self.vendor_dir
    }

    pub fn cookbook_dir(&self, name: &CookbookName) -> PathBuf {
        self.vendor_dir.join(name.0.as_str())
    }
}

impl ManifestSource for LocalCookbooks {
    /// A missing vendor directory holds no cookbooks.
    fn cookbook_names(&self) -> Result<Vec<CookbookName>, SyncError> {
        list_subdirs(&self.vendor_dir)
            .map(|dirs| dirs.into_iter().map(CookbookName::from).collect())
            .map_err(|e| read_err(self.vendor_dir.display().to_string(), e))
    }

    fn load_manifest(&self, name: &CookbookName) -> Result<CookbookManifest, SyncError> {
        let root = self.cookbook_dir(name);
        if !root.is_dir() {
            return Err(read_err(name.to_string(), format!("{} is not a directory", root.display())));
        }

        let mut manifest = CookbookManifest::new(name.clone());
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| read_err(name.to_string(), e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let relative = relative_name(relative);
            let checksum = hash_file(entry.path()).map_err(|e| read_err(name.to_string(), e))?;

            manifest
                .segments
                .entry(segment_for(&relative).to_string())
                .or_default()
                .push(RawManifestEntry {
                    name: relative.clone(),
                    checksum,
                    path: Some(relative),
                    full_path: Some(entry.path().display().to_string()),
                    url: None,
                    specificity: Some(LOCAL_SPECIFICITY.to_string()),
                });
        }
        Ok(manifest)
    }
}

/// Sorted names of the non-hidden subdirectories of `dir`. Missing `dir` → empty.
pub(crate) fn list_subdirs(dir: &Path) -> std::io::Result<Vec<String>> {
    list_entries(dir, |path| path.is_dir())
}

/// Sorted names of the non-hidden regular files in `dir`. Missing `dir` → empty.
pub(crate) fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    list_entries(dir, |path| path.is_file())
}

fn list_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> std::io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(entry.file_name().as_os_str()) || !keep(&entry.path()) {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Cookbook-relative path with `/` separators on every platform.
pub(crate) fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hex SHA-256 of a file's contents.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
