//! Utility functions shared across the Relic core
//!
//! Hashing helpers, normalized path handling, and atomic file replacement.
//! All functions here are pure or touch only the paths they are given.

use crate::error::{Result, RelicError};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Hash a file's content using SHA-256
///
/// Reads the file as opaque bytes in 8KB chunks; no text decoding and no
/// line-ending normalization, so the fingerprint is byte-exact and identical
/// across platforms for identical content.
///
/// # Errors
///
/// Returns [`RelicError::Io`] if the file cannot be opened or read.
pub fn hash_file_content(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| RelicError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| RelicError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert a path under `base` to its normalized tracked form
///
/// Tracked paths are repository-root-relative, use `/` separators on every
/// platform, and contain no `.` or `..` components, so two logically identical
/// paths from different operating systems normalize to the same string.
///
/// # Errors
///
/// Returns [`RelicError::Io`] (kind `InvalidInput`) if `path` is not under
/// `base` or escapes it via `..`.
pub fn normalize_rel_path(path: &Path, base: &Path) -> Result<String> {
    let relative = path.strip_prefix(base).map_err(|_| {
        RelicError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path is not under repository root {:?}", base),
            ),
        )
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(RelicError::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path escapes the repository root",
                    ),
                ));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Normalize a user-supplied relative path string (e.g. a CLI argument)
///
/// Backslashes become forward slashes, a leading `./` is stripped, and `.`
/// collapses to the empty string — mirroring [`normalize_rel_path`] for paths
/// that arrive as strings rather than filesystem entries.
pub fn normalize_rel_str(path: &str) -> String {
    let mut s = path.replace('\\', "/");
    while let Some(stripped) = s.strip_prefix("./") {
        s = stripped.to_string();
    }
    if s == "." {
        return String::new();
    }
    s.trim_end_matches('/').to_string()
}

/// Resolve a tracked path back to an absolute path under `root`
pub fn tracked_to_abs(root: &Path, tracked: &str) -> PathBuf {
    let mut abs = root.to_path_buf();
    for part in tracked.split('/').filter(|p| !p.is_empty()) {
        abs.push(part);
    }
    abs
}

/// Atomic file write (write to temp file then rename)
///
/// The target is never observable in a partially written state: either the
/// rename completed and the full content is in place, or the old content (or
/// absence) is untouched.
///
/// # Errors
///
/// Returns [`RelicError::Io`] if writing the temporary file or the rename fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(path);

    fs::write(&temp_path, content).map_err(|e| RelicError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| RelicError::io(path, e))?;

    Ok(())
}

/// Temp-file path used by [`atomic_write`], a sibling of the target
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// Copy a file, creating any missing parent directories of the destination
pub fn copy_with_dirs(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| RelicError::io(parent, e))?;
    }
    fs::copy(src, dst).map_err(|e| RelicError::io(dst, e))?;
    Ok(())
}

/// Remove empty parent directories of `path`, stopping at `stop` (exclusive)
///
/// Used after deleting a tracked file so the tree does not accumulate empty
/// directory husks. Stops at the first non-empty parent.
pub fn remove_empty_parents(path: &Path, stop: &Path) {
    let mut parent = path.parent();
    while let Some(dir) = parent {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        match fs::read_dir(dir) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    if fs::remove_dir(dir).is_err() {
                        break;
                    }
                    trace!("removed empty directory {:?}", dir);
                } else {
                    break;
                }
            }
            _ => break,
        }
        parent = dir.parent();
    }
}
