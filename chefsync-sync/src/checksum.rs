//! ChecksumIndex — normalized, comparable fingerprints of cookbook collections.
//!
//! Raw manifests come from a [`ManifestSource`] (the vendored cookbook
//! directory, or the server). Volatile fields are stripped and each segment
//! is sorted by `(name, checksum)` so that two manifests of the same content
//! always compare and serialize identically.

use chefsync_core::{
    ChecksumSnapshot, CookbookManifest, CookbookName, ManifestEntry, RawManifestEntry, Reporter,
    SegmentManifest,
};

use crate::diff::diff;
use crate::error::SyncError;

/// Anything that can enumerate cookbooks and hand out their manifests.
pub trait ManifestSource {
    /// Cookbook names, in any order.
    fn cookbook_names(&self) -> Result<Vec<CookbookName>, SyncError>;

    /// Manifest of one cookbook.
    ///
    /// # Errors
    ///
    /// [`SyncError::ArtifactRead`] when the manifest cannot be loaded.
    fn load_manifest(&self, name: &CookbookName) -> Result<CookbookManifest, SyncError>;
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Strip volatile fields, sort by `(name, checksum)` and keep one entry per name.
pub fn normalize_entries(raw: &[RawManifestEntry]) -> Vec<ManifestEntry> {
    let mut entries: Vec<ManifestEntry> = raw.iter().map(RawManifestEntry::normalize).collect();
    entries.sort();
    entries.dedup_by(|later, earlier| later.name == earlier.name);
    entries
}

/// Normalize every segment of `manifest`. Empty segments are dropped.
pub fn normalize_manifest(manifest: &CookbookManifest) -> SegmentManifest {
    manifest
        .segments
        .iter()
        .map(|(segment, raw)| (segment.clone(), normalize_entries(raw)))
        .filter(|(_, entries)| !entries.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// ChecksumIndex
// ---------------------------------------------------------------------------

/// Builds [`ChecksumSnapshot`]s, reporting progress through a [`Reporter`].
pub struct ChecksumIndex<'a> {
    reporter: &'a dyn Reporter,
}

impl<'a> ChecksumIndex<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Self { reporter }
    }

    /// Snapshot every cookbook `source` lists.
    pub fn build_snapshot<S>(&self, source: &S) -> Result<ChecksumSnapshot, SyncError>
    where
        S: ManifestSource + ?Sized,
    {
        self.build(source, None)
    }

    /// Snapshot `source` and emit a match/mismatch line per cookbook against
    /// an already-built `remote` snapshot. The lines are informational only.
    pub fn build_snapshot_against<S>(
        &self,
        source: &S,
        remote: &ChecksumSnapshot,
    ) -> Result<ChecksumSnapshot, SyncError>
    where
        S: ManifestSource + ?Sized,
    {
        self.build(source, Some(remote))
    }

    fn build<S>(
        &self,
        source: &S,
        remote: Option<&ChecksumSnapshot>,
    ) -> Result<ChecksumSnapshot, SyncError>
    where
        S: ManifestSource + ?Sized,
    {
        let mut names = source.cookbook_names()?;
        names.sort();
        names.dedup();

        let mut snapshot = ChecksumSnapshot::new();
        for name in names {
            let manifest = source.load_manifest(&name)?;
            let segments = normalize_manifest(&manifest);
            tracing::debug!(
                "checksummed {name}: {} file(s) in {} segment(s)",
                segments.values().map(Vec::len).sum::<usize>(),
                segments.len()
            );
            if let Some(remote) = remote {
                let result = diff(Some(&segments), remote.get(&name));
                self.reporter.cookbook_status(name.as_ref(), &result);
            }
            snapshot.insert(name, segments);
        }
        Ok(snapshot)
    }
}
