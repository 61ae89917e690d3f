//! Domain types for cookbook manifests and checksum snapshots.
//!
//! Raw manifest entries carry environment-specific fields (download URLs,
//! on-disk paths, specificity). Only [`ManifestEntry`] (name and checksum)
//! ever takes part in comparison.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// Segment holding files that do not live under a named segment directory.
pub const ROOT_FILES_SEGMENT: &str = "root_files";

/// Directory names that map one-to-one onto a manifest segment.
pub const NAMED_SEGMENTS: [&str; 8] = [
    "attributes",
    "definitions",
    "files",
    "libraries",
    "providers",
    "recipes",
    "resources",
    "templates",
];

/// Segment a cookbook-relative path belongs to.
///
/// The first path component decides; anything outside [`NAMED_SEGMENTS`]
/// (including top-level files such as `metadata.rb`) is a root file.
pub fn segment_for(relative_path: &str) -> &'static str {
    let Some((first, _)) = relative_path.split_once('/') else {
        return ROOT_FILES_SEGMENT;
    };
    NAMED_SEGMENTS
        .iter()
        .copied()
        .find(|segment| *segment == first)
        .unwrap_or(ROOT_FILES_SEGMENT)
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed cookbook name. Unique within a cookbook collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookbookName(pub String);

impl fmt::Display for CookbookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CookbookName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CookbookName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Borrow<str> for CookbookName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CookbookName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Manifest entries
// ---------------------------------------------------------------------------

/// One file of a cookbook manifest as produced by a loader or a server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawManifestEntry {
    pub name: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificity: Option<String>,
}

impl RawManifestEntry {
    /// Drop every volatile field, keeping only what identifies content.
    pub fn normalize(&self) -> ManifestEntry {
        ManifestEntry {
            name: self.name.clone(),
            checksum: self.checksum.clone(),
        }
    }
}

/// Content-relevant view of a manifest entry.
///
/// Field order matters: the derived `Ord` sorts by name, then checksum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub checksum: String,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
        }
    }
}

/// Full manifest of a single cookbook: segment name → raw entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookbookManifest {
    pub name: CookbookName,
    #[serde(default)]
    pub segments: BTreeMap<String, Vec<RawManifestEntry>>,
}

impl CookbookManifest {
    pub fn new(name: impl Into<CookbookName>) -> Self {
        Self {
            name: name.into(),
            segments: BTreeMap::new(),
        }
    }

    /// Number of files across all segments.
    pub fn file_count(&self) -> usize {
        self.segments.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Snapshots and diffs
// ---------------------------------------------------------------------------

/// Normalized manifest of one cookbook: segment name → sorted entries.
pub type SegmentManifest = BTreeMap<String, Vec<ManifestEntry>>;

/// Normalized checksum state of a whole cookbook collection.
pub type ChecksumSnapshot = BTreeMap<CookbookName, SegmentManifest>;

/// Segment name → names of files whose checksums differ. Empty ⇔ identical.
pub type DiffResult = BTreeMap<String, Vec<String>>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
