//! Ignore list for non-cookbook publishing.
//!
//! One glob pattern per line, relative to the repository root. Matching is
//! fnmatch-style: `*` also matches across `/`.

use std::path::{Path, PathBuf};

use glob::Pattern;

use chefsync_core::Reporter;

use crate::error::{io_err, SyncError};

#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<Pattern>,
}

impl IgnoreList {
    /// A list that ignores nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read `ignore_file`, anchoring each pattern at `repo_dir`.
    ///
    /// A missing file is reported and yields an empty list.
    pub fn load(
        ignore_file: &Path,
        repo_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<Self, SyncError> {
        let contents = match std::fs::read_to_string(ignore_file) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let name = ignore_file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| ignore_file.display().to_string());
                reporter.info(&format!("{name} absent, nothing will be ignored"));
                return Ok(Self::empty());
            }
            Err(err) => return Err(io_err(ignore_file, err)),
        };
        Self::parse(&contents, repo_dir)
    }

    /// Build from pattern lines. Blank lines are skipped.
    pub fn parse(contents: &str, repo_dir: &Path) -> Result<Self, SyncError> {
        let mut patterns = Vec::new();
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let anchored: PathBuf = repo_dir.join(line);
            let pattern = anchored.to_string_lossy().to_string();
            let compiled = Pattern::new(&pattern).map_err(|source| SyncError::IgnorePattern {
                pattern: line.to_string(),
                source,
            })?;
            patterns.push(compiled);
        }
        tracing::debug!("loaded {} ignore pattern(s)", patterns.len());
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(path))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
