//! Change classification between two state snapshots
//!
//! [`ChangeSet::between`] is a total function of two snapshots: every path in
//! either snapshot is classified as exactly one of added, modified, or
//! deleted, or omitted entirely when the fingerprints are equal. The `status`
//! operation is `ChangeSet::between(head, scan(root))` — the live tree against
//! the last committed head, never against the base.

use serde::{Deserialize, Serialize};

use crate::snapshot::StateSnapshot;

/// Kind of change recorded for a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Path present in the new snapshot only
    Added,
    /// Path present in both snapshots with differing fingerprints
    Modified,
    /// Path present in the old snapshot only
    Deleted,
}

/// Classified differences between two snapshots
///
/// Path lists are sorted and disjoint: a single diff run never assigns the
/// same path to more than one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Paths present only in the new snapshot
    pub added: Vec<String>,
    /// Paths present in both snapshots with different content
    pub modified: Vec<String>,
    /// Paths present only in the old snapshot
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// Compare two snapshots and classify every differing path
    ///
    /// - in `new` but not `old` ⇒ added
    /// - in `old` but not `new` ⇒ deleted
    /// - in both with differing fingerprints ⇒ modified
    /// - in both with equal fingerprints ⇒ omitted
    pub fn between(old: &StateSnapshot, new: &StateSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (path, fingerprint) in new.iter() {
            match old.get(path) {
                None => changes.added.push(path.to_string()),
                Some(old_fp) if old_fp != fingerprint => {
                    changes.modified.push(path.to_string());
                }
                Some(_) => {}
            }
        }

        for path in old.paths() {
            if !new.contains(path) {
                changes.deleted.push(path.to_string());
            }
        }

        // BTreeMap iteration already yields sorted paths; the lists inherit
        // that order.
        changes
    }

    /// Whether no path changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Total number of classified paths
    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Iterate over `(kind, path)` pairs, added then modified then deleted
    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, &str)> {
        self.added
            .iter()
            .map(|p| (ChangeKind::Added, p.as_str()))
            .chain(self.modified.iter().map(|p| (ChangeKind::Modified, p.as_str())))
            .chain(self.deleted.iter().map(|p| (ChangeKind::Deleted, p.as_str())))
    }
}
