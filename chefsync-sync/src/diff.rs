//! DiffEngine — per-segment, per-file comparison of normalized manifests and
//! the new / stale / updated / unchanged classification built on top of it.
//!
//! Everything here is pure: no I/O, deterministic given its inputs.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use chefsync_core::{ChecksumSnapshot, CookbookName, DiffResult, ManifestEntry, SegmentManifest};

/// Files whose checksums differ between `a` and `b`, grouped by segment.
///
/// A missing side is an empty manifest, and a file missing from one side
/// differs from any checksum on the other. Segments with no differing file
/// are absent from the result, so an empty result means identical content.
pub fn diff(a: Option<&SegmentManifest>, b: Option<&SegmentManifest>) -> DiffResult {
    let empty = SegmentManifest::new();
    let a = a.unwrap_or(&empty);
    let b = b.unwrap_or(&empty);

    let segments: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let mut result = DiffResult::new();

    for segment in segments {
        let left = a.get(segment).map(Vec::as_slice).unwrap_or_default();
        let right = b.get(segment).map(Vec::as_slice).unwrap_or_default();
        if left == right {
            continue;
        }

        let left_sums = checksums_by_name(left);
        let right_sums = checksums_by_name(right);
        let names: BTreeSet<&str> = left_sums.keys().chain(right_sums.keys()).copied().collect();

        let differing: Vec<String> = names
            .into_iter()
            .filter(|name| left_sums.get(name) != right_sums.get(name))
            .map(str::to_string)
            .collect();
        if !differing.is_empty() {
            result.insert(segment.clone(), differing);
        }
    }
    result
}

fn checksums_by_name(entries: &[ManifestEntry]) -> BTreeMap<&str, &str> {
    let mut sums = BTreeMap::new();
    for entry in entries {
        // first entry per name wins, matching normalization
        sums.entry(entry.name.as_str())
            .or_insert(entry.checksum.as_str());
    }
    sums
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Partition of `local ∪ remote` cookbook names. Every list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Local only.
    pub new: Vec<CookbookName>,
    /// Remote only.
    pub stale: Vec<CookbookName>,
    /// Both sides, content differs.
    pub updated: Vec<CookbookName>,
    /// Both sides, identical content.
    pub unchanged: Vec<CookbookName>,
    /// Non-empty diffs of the `updated` cookbooks.
    pub diffs: BTreeMap<CookbookName, DiffResult>,
}

impl Classification {
    pub fn classify(local: &ChecksumSnapshot, remote: &ChecksumSnapshot) -> Self {
        let mut out = Self::default();

        for (name, segments) in local {
            match remote.get(name) {
                None => out.new.push(name.clone()),
                Some(theirs) => {
                    let result = diff(Some(segments), Some(theirs));
                    if result.is_empty() {
                        out.unchanged.push(name.clone());
                    } else {
                        out.updated.push(name.clone());
                        out.diffs.insert(name.clone(), result);
                    }
                }
            }
        }
        out.stale = remote
            .keys()
            .filter(|name| !local.contains_key(*name))
            .cloned()
            .collect();
        out
    }

    /// `stale ∪ updated`, sorted: everything removed from the server.
    pub fn to_delete(&self) -> Vec<CookbookName> {
        sorted_union(&self.stale, &self.updated)
    }

    /// `new ∪ updated`, sorted: everything pushed to the server.
    pub fn to_upload(&self) -> Vec<CookbookName> {
        sorted_union(&self.new, &self.updated)
    }

    /// Whether the server already matches local content.
    pub fn in_sync(&self) -> bool {
        self.new.is_empty() && self.stale.is_empty() && self.updated.is_empty()
    }
}

fn sorted_union(a: &[CookbookName], b: &[CookbookName]) -> Vec<CookbookName> {
    a.iter()
        .chain(b)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
