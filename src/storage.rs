//! Persisted repository state
//!
//! Everything Relic knows lives under the `.relic` metadata directory at the
//! repository root:
//!
//! ```text
//! .relic/
//!   config.json       repository configuration
//!   base_state.json   base snapshot (path -> fingerprint)
//!   head_state.json   head snapshot (path -> fingerprint)
//!   log.json          append-only array of commit entries
//!   diffs/cN.json     per-commit record: changes + snapshot at that commit
//!   base/...          content cache of the base snapshot
//!   head/...          content cache of the head snapshot
//!   lock              advisory lock, present only while commit/restore runs
//! ```
//!
//! All JSON records are pretty-printed so the state stays human-diffable, and
//! every replacement goes through write-temp-then-rename. Loading validates
//! structure strictly: a log whose ids are not exactly `1..=N`, or a logged
//! commit without its diff record, fails with
//! [`CorruptState`](crate::RelicError::CorruptState) instead of being treated
//! as empty.

use crate::changes::ChangeSet;
use crate::error::{Result, RelicError};
use crate::log::{Commit, CommitLog, CommitRecord};
use crate::snapshot::StateSnapshot;
use crate::utils;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Name of the metadata directory at the repository root
pub const METADATA_DIR: &str = ".relic";

/// On-disk format version written into new repositories
pub const FORMAT_VERSION: u32 = 1;

const CONFIG_FILE: &str = "config.json";
const BASE_STATE_FILE: &str = "base_state.json";
const HEAD_STATE_FILE: &str = "head_state.json";
const LOG_FILE: &str = "log.json";
const DIFFS_DIR: &str = "diffs";
const BASE_DIR: &str = "base";
const HEAD_DIR: &str = "head";
const LOCK_FILE: &str = "lock";

/// Repository configuration persisted at init time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// On-disk format version
    pub format_version: u32,
    /// When the repository was initialized
    pub created_at: DateTime<Utc>,
}

impl RepoConfig {
    /// Config for a freshly initialized repository
    pub fn new() -> Self {
        RepoConfig {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the persisted state of one repository
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    meta: PathBuf,
}

impl Storage {
    /// Metadata directory for a repository root
    pub fn metadata_dir(root: &Path) -> PathBuf {
        root.join(METADATA_DIR)
    }

    /// Whether a repository has been initialized at `root`
    pub fn is_initialized(root: &Path) -> bool {
        Self::metadata_dir(root).is_dir()
    }

    /// Create the metadata directory structure for a new repository
    ///
    /// # Errors
    ///
    /// [`RelicError::AlreadyInitialized`] if the metadata directory exists.
    pub fn init(root: &Path) -> Result<Storage> {
        let meta = Self::metadata_dir(root);
        if meta.exists() {
            return Err(RelicError::AlreadyInitialized {
                path: root.to_path_buf(),
            });
        }

        for dir in [
            meta.clone(),
            meta.join(DIFFS_DIR),
            meta.join(BASE_DIR),
            meta.join(HEAD_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|e| RelicError::io(&dir, e))?;
        }

        debug!("initialized metadata directory at {:?}", meta);
        Ok(Storage {
            root: root.to_path_buf(),
            meta,
        })
    }

    /// Open an existing repository and validate its persisted state
    ///
    /// # Errors
    ///
    /// - [`RelicError::NotInitialized`] if the metadata directory is missing
    /// - [`RelicError::CorruptState`] if any record fails validation
    pub fn open(root: &Path) -> Result<Storage> {
        let meta = Self::metadata_dir(root);
        if !meta.is_dir() {
            return Err(RelicError::NotInitialized {
                path: root.to_path_buf(),
            });
        }

        let storage = Storage {
            root: root.to_path_buf(),
            meta,
        };
        storage.validate()?;
        Ok(storage)
    }

    /// Repository root this storage belongs to
    pub fn root(&self) -> &Path {
        &self.root
    }

    // -- record paths -------------------------------------------------------

    fn config_path(&self) -> PathBuf {
        self.meta.join(CONFIG_FILE)
    }

    fn base_state_path(&self) -> PathBuf {
        self.meta.join(BASE_STATE_FILE)
    }

    fn head_state_path(&self) -> PathBuf {
        self.meta.join(HEAD_STATE_FILE)
    }

    fn log_path(&self) -> PathBuf {
        self.meta.join(LOG_FILE)
    }

    fn record_path(&self, id: u64) -> PathBuf {
        self.meta.join(DIFFS_DIR).join(format!("c{}.json", id))
    }

    /// Path of the advisory lock file
    pub fn lock_path(&self) -> PathBuf {
        self.meta.join(LOCK_FILE)
    }

    /// Absolute path of a tracked file in the base content cache
    pub fn base_file(&self, tracked: &str) -> PathBuf {
        utils::tracked_to_abs(&self.meta.join(BASE_DIR), tracked)
    }

    /// Absolute path of a tracked file in the head content cache
    pub fn head_file(&self, tracked: &str) -> PathBuf {
        utils::tracked_to_abs(&self.meta.join(HEAD_DIR), tracked)
    }

    /// Absolute path of a tracked file in the working tree
    pub fn work_file(&self, tracked: &str) -> PathBuf {
        utils::tracked_to_abs(&self.root, tracked)
    }

    // -- json records -------------------------------------------------------

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let contents = fs::read_to_string(path).map_err(|e| RelicError::io(path, e))?;
        serde_json::from_str(&contents).map_err(|e| {
            RelicError::corrupt(format!("{}: {}", path.display(), e))
        })
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        utils::atomic_write(path, &bytes)
    }

    /// Load the repository configuration
    pub fn load_config(&self) -> Result<RepoConfig> {
        self.read_json(&self.config_path())
    }

    /// Persist the repository configuration
    pub fn store_config(&self, config: &RepoConfig) -> Result<()> {
        self.write_json(&self.config_path(), config)
    }

    /// Load the immutable base snapshot
    pub fn load_base_state(&self) -> Result<StateSnapshot> {
        self.read_json(&self.base_state_path())
    }

    /// Persist the base snapshot (written once, at init)
    pub fn store_base_state(&self, snapshot: &StateSnapshot) -> Result<()> {
        self.write_json(&self.base_state_path(), snapshot)
    }

    /// Load the head snapshot
    pub fn load_head_state(&self) -> Result<StateSnapshot> {
        self.read_json(&self.head_state_path())
    }

    /// Persist the head snapshot
    pub fn store_head_state(&self, snapshot: &StateSnapshot) -> Result<()> {
        self.write_json(&self.head_state_path(), snapshot)
    }

    /// Load the commit log
    pub fn load_log(&self) -> Result<CommitLog> {
        let log: CommitLog = self.read_json(&self.log_path())?;
        log.validate()?;
        Ok(log)
    }

    /// Persist the commit log
    ///
    /// The log rename is the commit point of the whole commit operation: a
    /// crash before it leaves the commit unrecorded and its staged records
    /// orphaned (the next commit overwrites them).
    pub fn store_log(&self, log: &CommitLog) -> Result<()> {
        self.write_json(&self.log_path(), log)
    }

    /// Load the per-commit record for `id`
    pub fn load_commit_record(&self, id: u64) -> Result<CommitRecord> {
        let record: CommitRecord = self.read_json(&self.record_path(id))?;
        if record.id != id {
            return Err(RelicError::corrupt(format!(
                "diff record {} carries id {}",
                self.record_path(id).display(),
                record.id
            )));
        }
        Ok(record)
    }

    /// Persist the per-commit record for a commit
    pub fn store_commit_record(&self, record: &CommitRecord) -> Result<()> {
        self.write_json(&self.record_path(record.id), record)
    }

    // -- structural validation ---------------------------------------------

    /// Validate every persisted record structurally
    ///
    /// Fails loudly on corrupt state; never degrades to "empty repository".
    pub fn validate(&self) -> Result<()> {
        self.load_config()?;
        self.load_base_state()?;
        self.load_head_state()?;
        let log = self.load_log()?;

        for commit in log.commits() {
            let record = self.load_commit_record(commit.id).map_err(|e| match e {
                RelicError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                    RelicError::corrupt(format!(
                        "commit c{} is logged but its diff record {:?} is missing",
                        commit.id, path
                    ))
                }
                other => other,
            })?;
            if record.changes != commit.changes {
                return Err(RelicError::corrupt(format!(
                    "diff record for c{} disagrees with the log entry",
                    commit.id
                )));
            }
        }

        trace!("validated repository state at {:?}", self.meta);
        Ok(())
    }

    // -- content caches -----------------------------------------------------

    /// Copy tracked files from the working tree into the base content cache
    pub fn capture_base_cache<'a>(&self, paths: impl Iterator<Item = &'a str>) -> Result<()> {
        for tracked in paths {
            let src = self.work_file(tracked);
            if src.is_file() {
                utils::copy_with_dirs(&src, &self.base_file(tracked))?;
            }
        }
        Ok(())
    }

    /// Apply a change set to the head content cache
    ///
    /// Added and modified files are copied in from the working tree; deleted
    /// files are removed along with any now-empty parent directories. Files
    /// that vanish between scan and copy are skipped with a warning rather
    /// than failing the commit.
    pub fn update_head_cache(&self, changes: &ChangeSet) -> Result<()> {
        let head_root = self.meta.join(HEAD_DIR);

        for tracked in changes.added.iter().chain(&changes.modified) {
            let src = self.work_file(tracked);
            if src.is_file() {
                utils::copy_with_dirs(&src, &self.head_file(tracked))?;
            } else {
                warn!("file {} vanished before head cache update", tracked);
            }
        }

        for tracked in &changes.deleted {
            let cached = self.head_file(tracked);
            if cached.is_file() {
                fs::remove_file(&cached).map_err(|e| RelicError::io(&cached, e))?;
                utils::remove_empty_parents(&cached, &head_root);
            }
        }

        Ok(())
    }

    /// Rebuild the head content cache from the working tree
    ///
    /// Used after restore: the cache is recreated to mirror exactly the given
    /// tracked paths as they now exist on disk.
    pub fn reset_head_cache<'a>(&self, paths: impl Iterator<Item = &'a str>) -> Result<()> {
        let head_root = self.meta.join(HEAD_DIR);
        if head_root.exists() {
            fs::remove_dir_all(&head_root).map_err(|e| RelicError::io(&head_root, e))?;
        }
        fs::create_dir_all(&head_root).map_err(|e| RelicError::io(&head_root, e))?;

        for tracked in paths {
            let src = self.work_file(tracked);
            if src.is_file() {
                utils::copy_with_dirs(&src, &self.head_file(tracked))?;
            }
        }
        Ok(())
    }

    /// Read a file's cached head content, `None` if not cached
    pub fn read_head_content(&self, tracked: &str) -> Result<Option<Vec<u8>>> {
        let path = self.head_file(tracked);
        if !path.is_file() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| RelicError::io(&path, e))
    }

    /// Remove the metadata directory entirely
    pub fn destroy(root: &Path) -> Result<()> {
        let meta = Self::metadata_dir(root);
        if meta.exists() {
            fs::remove_dir_all(&meta).map_err(|e| RelicError::io(&meta, e))?;
        }
        Ok(())
    }
}

/// Exclusive advisory lock held for the duration of a commit or restore
///
/// Backed by a lock file created with `create_new`, so two processes cannot
/// both hold it; the file is removed when the guard drops.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    /// Acquire the lock, failing fast if it is already held
    ///
    /// # Errors
    ///
    /// - [`RelicError::Locked`] if the lock file already exists
    /// - [`RelicError::Io`] for any other failure creating it
    pub fn acquire(storage: &Storage) -> Result<RepoLock> {
        let path = storage.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                trace!("acquired repository lock at {:?}", path);
                Ok(RepoLock { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RelicError::Locked { path })
            }
            Err(e) => Err(RelicError::io(&path, e)),
        }
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to release repository lock {:?}: {}", self.path, e);
        }
    }
}
