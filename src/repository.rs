//! The repository handle tying the core components together
//!
//! A [`Repository`] is an explicit context value — root path, compiled ignore
//! rules, loaded commit log — passed through every operation instead of any
//! ambient global state. The mutating operations (`commit`, `restore`) each
//! run under the exclusive advisory lock so two processes cannot interleave
//! them against the same repository.

use crate::changes::ChangeSet;
use crate::diff::{self, DiffOptions, FileDiff};
use crate::error::{Result, RelicError};
use crate::ignore::{self, IgnoreMatcher, IGNORE_FILE};
use crate::log::{self, Commit, CommitLog, CommitRecord};
use crate::restore::{self, RestoreReport};
use crate::snapshot::{self, ScanOutcome, ScanWarning};
use crate::storage::{RepoConfig, RepoLock, Storage};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Starter content for a fresh `.relicignore`
const IGNORE_FILE_HEADER: &str = "\
# Relic ignore rules: one glob pattern per line, merged after the built-in
# defaults. `dir/` excludes a whole subtree; `*.ext` matches at any depth.
";

/// Result of a `status` query: the change set plus scan warnings
#[derive(Debug)]
pub struct StatusReport {
    /// Changes of the live tree relative to the last committed head
    pub changes: ChangeSet,
    /// Files the scan could not read (collected, not fatal)
    pub warnings: Vec<ScanWarning>,
}

impl StatusReport {
    /// Whether the working tree matches the head snapshot
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Handle to an initialized repository
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    storage: Storage,
    config: RepoConfig,
    log: CommitLog,
    matcher: IgnoreMatcher,
}

impl Repository {
    /// Initialize a new repository at `root`
    ///
    /// Captures the base snapshot (state and content cache), creates the head
    /// snapshot equal to it, writes an empty commit log and the repository
    /// config, and drops a starter ignore file unless one already exists.
    ///
    /// # Errors
    ///
    /// [`RelicError::AlreadyInitialized`] if `root` already has a repository.
    pub fn init(root: impl Into<PathBuf>) -> Result<Repository> {
        let root = root.into();
        let storage = Storage::init(&root)?;

        let ignore_path = root.join(IGNORE_FILE);
        if !ignore_path.exists() {
            fs::write(&ignore_path, IGNORE_FILE_HEADER)
                .map_err(|e| RelicError::io(&ignore_path, e))?;
        }

        let matcher = IgnoreMatcher::for_repository(&root)?;
        let outcome = snapshot::scan_tree(&root, &matcher)?;
        for warning in &outcome.warnings {
            warn!("init: skipped {}: {}", warning.path, warning.message);
        }

        let config = RepoConfig::new();
        storage.store_config(&config)?;
        storage.store_base_state(&outcome.snapshot)?;
        storage.store_head_state(&outcome.snapshot)?;
        storage.store_log(&CommitLog::new())?;
        storage.capture_base_cache(outcome.snapshot.paths())?;
        storage.reset_head_cache(outcome.snapshot.paths())?;

        info!(
            "initialized repository at {:?} tracking {} files",
            root,
            outcome.snapshot.len()
        );
        Ok(Repository {
            root,
            storage,
            config,
            log: CommitLog::new(),
            matcher,
        })
    }

    /// Open an existing repository
    ///
    /// # Errors
    ///
    /// - [`RelicError::NotInitialized`] if `root` has no repository
    /// - [`RelicError::CorruptState`] if persisted state fails validation
    pub fn open(root: impl Into<PathBuf>) -> Result<Repository> {
        let root = root.into();
        let storage = Storage::open(&root)?;
        let config = storage.load_config()?;
        let log = storage.load_log()?;
        let matcher = IgnoreMatcher::for_repository(&root)?;

        Ok(Repository {
            root,
            storage,
            config,
            log,
            matcher,
        })
    }

    /// Remove all repository metadata (and the ignore file) from `root`
    ///
    /// The tracked files themselves are left untouched.
    pub fn destroy(root: &Path) -> Result<()> {
        if !Storage::is_initialized(root) && !root.join(IGNORE_FILE).exists() {
            return Err(RelicError::NotInitialized {
                path: root.to_path_buf(),
            });
        }
        Storage::destroy(root)?;
        let ignore_path = root.join(IGNORE_FILE);
        if ignore_path.exists() {
            fs::remove_file(&ignore_path).map_err(|e| RelicError::io(&ignore_path, e))?;
        }
        info!("destroyed repository metadata at {:?}", root);
        Ok(())
    }

    /// Repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository configuration
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Commits recorded so far, oldest first
    pub fn log(&self) -> &[Commit] {
        self.log.commits()
    }

    /// Scan the live tree through the repository's ignore rules
    pub fn scan(&self) -> Result<ScanOutcome> {
        snapshot::scan_tree(&self.root, &self.matcher)
    }

    /// Compare the live tree against the last committed head
    ///
    /// This never compares against the base snapshot; after every commit a
    /// clean status means "nothing changed since that commit".
    pub fn status(&self) -> Result<StatusReport> {
        let head = self.storage.load_head_state()?;
        let outcome = self.scan()?;
        Ok(StatusReport {
            changes: ChangeSet::between(&head, &outcome.snapshot),
            warnings: outcome.warnings,
        })
    }

    /// Record the current changes as a new commit
    ///
    /// Runs under the repository lock. The per-commit record is written
    /// first, then the head content cache and head state are replaced, and
    /// the log append — the commit point — happens last; every record is
    /// swapped in via an atomic rename.
    ///
    /// # Errors
    ///
    /// - [`RelicError::NothingToCommit`] if the working tree is clean
    /// - [`RelicError::Locked`] if another commit or restore is running
    pub fn commit(&mut self, message: Option<&str>) -> Result<Commit> {
        let _lock = RepoLock::acquire(&self.storage)?;

        let head = self.storage.load_head_state()?;
        let outcome = self.scan()?;
        for warning in &outcome.warnings {
            warn!("commit: skipped {}: {}", warning.path, warning.message);
        }

        let changes = ChangeSet::between(&head, &outcome.snapshot);
        if changes.is_empty() {
            return Err(RelicError::NothingToCommit);
        }

        let commit = Commit {
            id: self.log.next_id(),
            timestamp: Utc::now(),
            message: message.unwrap_or("Commit").to_string(),
            changes: changes.clone(),
        };

        self.storage.store_commit_record(&CommitRecord {
            id: commit.id,
            changes: changes.clone(),
            snapshot: outcome.snapshot.clone(),
        })?;
        self.storage.update_head_cache(&changes)?;
        self.storage.store_head_state(&outcome.snapshot)?;

        let mut log = self.log.clone();
        log.append(commit.clone())?;
        self.storage.store_log(&log)?;
        self.log = log;

        debug!(
            "committed {}: +{} ~{} -{}",
            commit.label(),
            changes.added.len(),
            changes.modified.len(),
            changes.deleted.len()
        );
        Ok(commit)
    }

    /// Line-level diff of one file against its last-committed content
    ///
    /// Compares the working copy with the head content cache. Only meaningful
    /// while the previous content is still cached under the metadata
    /// directory; history alone cannot regenerate it.
    ///
    /// # Errors
    ///
    /// [`RelicError::Io`] (kind `NotFound`) if the path exists neither in the
    /// head cache nor in the working tree.
    pub fn diff_file(&self, path: &str) -> Result<FileDiff> {
        let tracked = crate::utils::normalize_rel_str(path);
        let head_content = self.storage.read_head_content(&tracked)?;

        let work_path = crate::utils::tracked_to_abs(&self.root, &tracked);
        let work_content = if work_path.is_file() {
            Some(fs::read(&work_path).map_err(|e| RelicError::io(&work_path, e))?)
        } else {
            None
        };

        if head_content.is_none() && work_content.is_none() {
            return Err(RelicError::io(
                &work_path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file not found in head snapshot or working tree",
                ),
            ));
        }

        Ok(diff::file_diff(
            &tracked,
            head_content.as_deref().unwrap_or(b""),
            work_content.as_deref().unwrap_or(b""),
            &DiffOptions::default(),
        ))
    }

    /// Restore the working tree toward a recorded commit
    ///
    /// Accepts `c3` or `3`. Destructive: the caller (CLI) is responsible for
    /// confirming with the user before invoking this. Runs under the
    /// repository lock; the commit log is never modified.
    ///
    /// # Errors
    ///
    /// - [`RelicError::UnknownCommit`] for an unknown or malformed id
    /// - [`RelicError::Locked`] if another commit or restore is running
    pub fn restore(&mut self, commit_id: &str) -> Result<RestoreReport> {
        let target_id = log::parse_commit_id(commit_id)?;
        if self.log.get(target_id).is_none() {
            return Err(RelicError::UnknownCommit {
                id: commit_id.to_string(),
            });
        }

        let _lock = RepoLock::acquire(&self.storage)?;
        restore::restore_to_commit(&self.storage, &self.log, &self.matcher, target_id)
    }

    /// Reload ignore rules from disk (after the user edited the ignore file)
    pub fn reload_ignore_rules(&mut self) -> Result<()> {
        self.matcher = ignore::IgnoreMatcher::for_repository(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_captures_base_equal_to_head() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "hello").unwrap();

        let repo = Repository::init(root).unwrap();
        let base = repo.storage.load_base_state().unwrap();
        let head = repo.storage.load_head_state().unwrap();

        assert_eq!(base, head);
        assert_eq!(base.len(), 1);
        assert!(base.contains("a.txt"));
        assert!(root.join(IGNORE_FILE).exists());
    }

    #[test]
    fn test_init_twice_fails() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();
        assert!(matches!(
            Repository::init(temp_dir.path()).unwrap_err(),
            RelicError::AlreadyInitialized { .. }
        ));
    }

    #[test]
    fn test_open_before_init_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            Repository::open(temp_dir.path()).unwrap_err(),
            RelicError::NotInitialized { .. }
        ));
    }

    #[test]
    fn test_status_clean_after_init() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "hello").unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        assert!(repo.status().unwrap().is_clean());
    }

    #[test]
    fn test_commit_clean_tree_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = Repository::init(temp_dir.path()).unwrap();
        assert!(matches!(
            repo.commit(None).unwrap_err(),
            RelicError::NothingToCommit
        ));
        assert!(repo.log().is_empty());
    }

    #[test]
    fn test_commit_releases_lock_on_nothing_to_commit() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = Repository::init(temp_dir.path()).unwrap();
        let _ = repo.commit(None);
        // Lock must not linger after the failed commit.
        fs::write(temp_dir.path().join("new.txt"), "x").unwrap();
        assert!(repo.commit(Some("works")).is_ok());
    }

    #[test]
    fn test_destroy_removes_metadata_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "hello").unwrap();
        Repository::init(root).unwrap();

        Repository::destroy(root).unwrap();
        assert!(!root.join(crate::storage::METADATA_DIR).exists());
        assert!(!root.join(IGNORE_FILE).exists());
        assert!(root.join("a.txt").exists());

        assert!(matches!(
            Repository::destroy(root).unwrap_err(),
            RelicError::NotInitialized { .. }
        ));
    }
}
