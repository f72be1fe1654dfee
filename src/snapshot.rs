//! State snapshots and directory scanning
//!
//! A [`StateSnapshot`] maps tracked relative paths to content fingerprints.
//! Two snapshots are distinguished by the repository: the immutable *base*
//! snapshot captured once at initialization, and the *head* snapshot replaced
//! wholesale by every successful commit.
//!
//! The [`Scanner`] walks the tree in lexicographic order (so snapshots of
//! identical tree states are reproducible), prunes whole ignored subtrees
//! without descending into them, and fingerprints every remaining file.
//! Per-file read failures are collected as [`ScanWarning`]s rather than
//! aborting the scan, so status and commit stay usable on trees with a few
//! inaccessible files. Symlink cycles are the one per-entry hard failure.

use crate::error::{Result, RelicError};
use crate::fingerprint;
use crate::ignore::IgnoreMatcher;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Mapping of tracked relative paths to content fingerprints
///
/// Keys are normalized (forward-slash, root-relative) and unique; the map is
/// ordered so serialization and iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    entries: BTreeMap<String, String>,
}

impl StateSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fingerprint for a tracked path, replacing any previous value
    pub fn insert(&mut self, path: String, fingerprint: String) {
        self.entries.insert(path, fingerprint);
    }

    /// Fingerprint recorded for a tracked path, if any
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Whether the snapshot tracks the given path
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate over `(path, fingerprint)` pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, h)| (p.as_str(), h.as_str()))
    }

    /// Iterate over tracked paths in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of tracked paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot tracks no paths
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for StateSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        StateSnapshot {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A per-file failure collected during a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path that could not be processed (relative when known)
    pub path: String,
    /// Human-readable cause
    pub message: String,
}

/// Result of scanning a tree: the snapshot plus collected warnings
#[derive(Debug)]
pub struct ScanOutcome {
    /// Fingerprints of every tracked file that could be read
    pub snapshot: StateSnapshot,
    /// Files skipped because they could not be read
    pub warnings: Vec<ScanWarning>,
}

/// Directory scanner producing [`StateSnapshot`]s
#[derive(Debug)]
pub struct Scanner<'a> {
    root: PathBuf,
    matcher: &'a IgnoreMatcher,
}

impl<'a> Scanner<'a> {
    /// Create a scanner for `root` filtering through `matcher`
    pub fn new(root: impl Into<PathBuf>, matcher: &'a IgnoreMatcher) -> Self {
        Scanner {
            root: root.into(),
            matcher,
        }
    }

    /// Walk the tree and fingerprint every tracked file
    ///
    /// Traversal is lexicographic and ignored directories are pruned before
    /// descent. Unreadable entries become [`ScanWarning`]s; a symlink cycle
    /// fails the scan with [`RelicError::Cycle`].
    pub fn scan(&self) -> Result<ScanOutcome> {
        let mut snapshot = StateSnapshot::new();
        let mut warnings = Vec::new();

        let root = self.root.clone();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                match utils::normalize_rel_path(entry.path(), &root) {
                    Ok(rel) => !self.matcher.is_ignored(&rel),
                    Err(_) => false,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    warn!("walk error at {}: {}", path, e);
                    warnings.push(ScanWarning {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let rel = utils::normalize_rel_path(entry.path(), &self.root)?;
            match fingerprint::fingerprint_path(entry.path()) {
                Ok(fp) => {
                    snapshot.insert(rel, fp);
                }
                Err(cycle @ RelicError::Cycle { .. }) => return Err(cycle),
                Err(e) => {
                    warn!("skipping unreadable entry {}: {}", rel, e);
                    warnings.push(ScanWarning {
                        path: rel,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "scanned {} files under {:?} ({} warnings)",
            snapshot.len(),
            self.root,
            warnings.len()
        );
        Ok(ScanOutcome { snapshot, warnings })
    }
}

/// Convenience wrapper: scan `root` through `matcher`
pub fn scan_tree(root: &Path, matcher: &IgnoreMatcher) -> Result<ScanOutcome> {
    Scanner::new(root, matcher).scan()
}
