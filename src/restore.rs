//! Deletion-replay restore
//!
//! Restore approximates an earlier tree state from metadata plus the base
//! content cache; it is intentionally partial and its guarantees are spelled
//! out here rather than glossed over.
//!
//! For a target commit `cN` the restored tracked file set is exactly
//!
//! ```text
//! base.keys() − union(deleted entries of commits c1..=cN)
//! ```
//!
//! i.e. every path captured at initialization that had not been recorded as
//! deleted by the target point. The algorithm:
//!
//! 1. Remove every currently tracked file outside that set (pruning emptied
//!    directories); ignored paths and the metadata directory are never touched.
//! 2. For each path in the set: if it still exists on disk it is left as-is —
//!    content modified after the target is **not** reverted, since no
//!    historical content is stored; if it is missing it is copied back from
//!    the base content cache.
//! 3. Paths recorded in the target commit's snapshot that are outside the set
//!    and absent from disk were added after initialization and their content
//!    is gone; they are reported as unreconstructable so the caller can warn
//!    the user honestly.
//!
//! The commit log is never mutated; only the live tree, the head snapshot,
//! and the head content cache change. Restoring the same target from the same
//! starting tree and log is deterministic.

use crate::error::{Result, RelicError};
use crate::ignore::IgnoreMatcher;
use crate::log::CommitLog;
use crate::snapshot::{self, StateSnapshot};
use crate::storage::Storage;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use tracing::{debug, info, warn};

/// Outcome of a restore operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Label of the restored commit (`cN`)
    pub target: String,
    /// Tracked files present after the restore
    pub files_kept: usize,
    /// Files removed because they did not belong at the target
    pub files_removed: usize,
    /// Subset of kept files copied back from the base content cache
    pub resurrected: usize,
    /// Paths logically present at the target whose content cannot be
    /// reconstructed (added after init, no longer on disk)
    pub unreconstructable: Vec<String>,
    /// Kept paths whose on-disk content differs from what the target commit
    /// recorded (modified later, or resurrected with base content)
    pub not_reverted: Vec<String>,
}

/// Restore the working tree toward the state of `target_id`
///
/// The caller is expected to hold the repository lock and to have confirmed
/// the destructive operation with the user.
///
/// # Errors
///
/// - [`RelicError::UnknownCommit`] if `target_id` is not in the log
/// - [`RelicError::Io`] / [`RelicError::Cycle`] from tree traversal or copies
pub fn restore_to_commit(
    storage: &Storage,
    log: &CommitLog,
    matcher: &IgnoreMatcher,
    target_id: u64,
) -> Result<RestoreReport> {
    let target = log.get(target_id).ok_or_else(|| RelicError::UnknownCommit {
        id: format!("c{}", target_id),
    })?;
    let target_record = storage.load_commit_record(target.id)?;
    let base = storage.load_base_state()?;

    // Union of everything recorded as deleted up to and including the target.
    let mut deleted_by_target: BTreeSet<&str> = BTreeSet::new();
    for commit in &log.commits()[..target_id as usize] {
        deleted_by_target.extend(commit.changes.deleted.iter().map(String::as_str));
    }

    let target_set: BTreeSet<&str> = base
        .paths()
        .filter(|path| !deleted_by_target.contains(path))
        .collect();

    debug!(
        "restore target {}: {} of {} base paths survive deletion replay",
        target.label(),
        target_set.len(),
        base.len()
    );

    // Trim the live tree down to the target set.
    let current = snapshot::scan_tree(storage.root(), matcher)?.snapshot;
    let mut files_removed = 0;
    for path in current.paths() {
        if !target_set.contains(path) {
            let abs = storage.work_file(path);
            if abs.is_file() {
                fs::remove_file(&abs).map_err(|e| RelicError::io(&abs, e))?;
                utils::remove_empty_parents(&abs, storage.root());
                files_removed += 1;
            }
        }
    }

    // Materialize the target set and rebuild the head snapshot as we go.
    let mut files_kept = 0;
    let mut resurrected = 0;
    let mut not_reverted = Vec::new();
    let mut new_head = StateSnapshot::new();

    for &path in &target_set {
        let abs = storage.work_file(path);
        let final_fingerprint = if abs.is_file() {
            // Left as-is; latest content wins over any recorded version.
            match current.get(path) {
                Some(fp) => fp.to_string(),
                None => {
                    warn!("kept file {} was not readable during the scan", path);
                    continue;
                }
            }
        } else {
            let cached = storage.base_file(path);
            if !cached.is_file() {
                // Base cache incomplete (e.g. the file was unreadable at
                // init); nothing to copy back.
                warn!("base cache has no content for {}", path);
                continue;
            }
            let Some(base_fp) = base.get(path) else {
                continue; // target set paths always come from the base snapshot
            };
            utils::copy_with_dirs(&cached, &abs)?;
            resurrected += 1;
            base_fp.to_string()
        };

        if target_record.snapshot.get(path) != Some(final_fingerprint.as_str()) {
            not_reverted.push(path.to_string());
        }
        new_head.insert(path.to_string(), final_fingerprint);
        files_kept += 1;
    }

    // Logically expected at the target but neither restorable nor on disk.
    let mut unreconstructable = Vec::new();
    for path in target_record.snapshot.paths() {
        if !target_set.contains(path) && !storage.work_file(path).is_file() {
            unreconstructable.push(path.to_string());
        }
    }

    // The head now reflects the restored tree; the log is left untouched.
    storage.store_head_state(&new_head)?;
    storage.reset_head_cache(new_head.paths())?;

    info!(
        "restored to {}: kept {}, removed {}, resurrected {}, {} unreconstructable",
        target.label(),
        files_kept,
        files_removed,
        resurrected,
        unreconstructable.len()
    );

    Ok(RestoreReport {
        target: target.label(),
        files_kept,
        files_removed,
        resurrected,
        unreconstructable,
        not_reverted,
    })
}
