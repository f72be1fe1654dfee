//! Content fingerprinting for tracked files
//!
//! A fingerprint is the hex-encoded SHA-256 digest of a file's exact bytes.
//! The policy is byte-exact: files are read as opaque byte streams, so a
//! CRLF/LF difference is a content difference and fingerprints never depend
//! on the platform the scan runs on.
//!
//! Symbolic links are leaves. The link chain is resolved hop by hop with a
//! visited set; a chain that loops fails with [`RelicError::Cycle`] instead of
//! hanging, a resolved regular file is fingerprinted by its content, and a
//! link that ends at a directory is fingerprinted by its target path (the
//! target tree is never descended).

use crate::error::{Result, RelicError};
use crate::utils;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Maximum symlink hops before a chain is treated as a cycle
const MAX_LINK_HOPS: usize = 40;

/// Compute the fingerprint of a filesystem entry
///
/// # Errors
///
/// - [`RelicError::Io`] if the entry or a link target cannot be read
/// - [`RelicError::Cycle`] if a symlink chain loops
pub fn fingerprint_path(path: &Path) -> Result<String> {
    let metadata = fs::symlink_metadata(path).map_err(|e| RelicError::io(path, e))?;

    if metadata.file_type().is_symlink() {
        fingerprint_symlink(path)
    } else {
        utils::hash_file_content(path)
    }
}

/// Fingerprint a symlink by its resolved content
fn fingerprint_symlink(path: &Path) -> Result<String> {
    let target = resolve_link_chain(path)?;
    let metadata = fs::metadata(&target).map_err(|e| RelicError::io(&target, e))?;

    if metadata.is_dir() {
        // Links to directories are opaque leaves; fingerprint the resolved
        // target path rather than descending into it.
        trace!("symlink {:?} resolves to directory {:?}", path, target);
        Ok(utils::hash_data(
            format!("dirlink:{}", target.display()).as_bytes(),
        ))
    } else {
        utils::hash_file_content(&target)
    }
}

/// Follow a symlink chain to its final non-link target
///
/// Each hop is recorded in a visited set; revisiting a path (or exceeding
/// [`MAX_LINK_HOPS`]) means the chain loops and fails with [`RelicError::Cycle`].
fn resolve_link_chain(path: &Path) -> Result<PathBuf> {
    let mut visited = HashSet::new();
    let mut current = path.to_path_buf();

    for _ in 0..MAX_LINK_HOPS {
        if !visited.insert(current.clone()) {
            return Err(RelicError::Cycle { path: current });
        }

        let metadata = fs::symlink_metadata(&current).map_err(|e| RelicError::io(&current, e))?;
        if !metadata.file_type().is_symlink() {
            return Ok(current);
        }

        let target = fs::read_link(&current).map_err(|e| RelicError::io(&current, e))?;
        current = if target.is_absolute() {
            target
        } else {
            current
                .parent()
                .map(|p| p.join(&target))
                .unwrap_or(target)
        };
    }

    Err(RelicError::Cycle {
        path: path.to_path_buf(),
    })
}
