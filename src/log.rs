//! The append-only commit log
//!
//! Commits carry sequential 1-based ids (displayed as `c1`, `c2`, …) that are
//! strictly increasing and gap-free: the next id is always `len + 1`. Entries
//! are immutable once appended; nothing in the core ever deletes or rewrites
//! one, and restore only reads the log.

use crate::changes::ChangeSet;
use crate::error::{Result, RelicError};
use crate::snapshot::StateSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Sequential 1-based id
    pub id: u64,
    /// When the commit was recorded
    pub timestamp: DateTime<Utc>,
    /// User-provided message
    pub message: String,
    /// Changes this commit captured
    pub changes: ChangeSet,
}

impl Commit {
    /// Display label for the id (`c1`, `c2`, …)
    pub fn label(&self) -> String {
        format!("c{}", self.id)
    }
}

/// Per-commit record persisted alongside the log, keyed by commit id
///
/// Holds the head snapshot as of this commit (the log itself stays small and
/// human-scannable). Restore uses the snapshot to report paths that were
/// logically present at the target but cannot be reconstructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Id of the commit this record belongs to
    pub id: u64,
    /// Changes captured by the commit (duplicated from the log entry)
    pub changes: ChangeSet,
    /// Head snapshot at the time of the commit
    pub snapshot: StateSnapshot,
}

/// Ordered, append-only sequence of commits (oldest first)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitLog {
    commits: Vec<Commit>,
}

impl CommitLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits oldest-first
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Number of recorded commits
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether no commit has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Id the next successful commit will receive
    pub fn next_id(&self) -> u64 {
        self.commits.len() as u64 + 1
    }

    /// Look up a commit by id
    pub fn get(&self, id: u64) -> Option<&Commit> {
        // Ids are gap-free and 1-based, so the vector index is id - 1.
        id.checked_sub(1)
            .and_then(|idx| self.commits.get(idx as usize))
    }

    /// Latest commit, if any
    pub fn latest(&self) -> Option<&Commit> {
        self.commits.last()
    }

    /// Append a commit, enforcing id continuity
    pub fn append(&mut self, commit: Commit) -> Result<()> {
        if commit.id != self.next_id() {
            return Err(RelicError::corrupt(format!(
                "commit id {} breaks the sequence (expected {})",
                commit.id,
                self.next_id()
            )));
        }
        self.commits.push(commit);
        Ok(())
    }

    /// Structural validation: ids must be exactly 1..=len in order
    pub fn validate(&self) -> Result<()> {
        for (idx, commit) in self.commits.iter().enumerate() {
            let expected = idx as u64 + 1;
            if commit.id != expected {
                return Err(RelicError::corrupt(format!(
                    "commit log entry {} has id {} (expected {})",
                    idx, commit.id, expected
                )));
            }
        }
        Ok(())
    }
}

/// Parse a user-supplied commit id (`c3` or `3`)
///
/// Returns [`RelicError::UnknownCommit`] for anything that is not a positive
/// integer with an optional `c` prefix; existence in the log is checked by
/// the caller.
pub fn parse_commit_id(raw: &str) -> Result<u64> {
    let digits = raw.strip_prefix('c').unwrap_or(raw);
    digits
        .parse::<u64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| RelicError::UnknownCommit {
            id: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: u64) -> Commit {
        Commit {
            id,
            timestamp: Utc::now(),
            message: format!("commit {}", id),
            changes: ChangeSet::default(),
        }
    }

    #[test]
    fn test_ids_are_sequential_and_gap_free() {
        let mut log = CommitLog::new();
        assert_eq!(log.next_id(), 1);

        for expected in 1..=5 {
            let c = commit(log.next_id());
            assert_eq!(c.id, expected);
            let before = log.len();
            log.append(c).unwrap();
            assert_eq!(log.len(), before + 1);
        }

        assert!(log.validate().is_ok());
        assert_eq!(log.get(3).unwrap().label(), "c3");
        assert_eq!(log.latest().unwrap().id, 5);
    }

    #[test]
    fn test_append_rejects_out_of_sequence_id() {
        let mut log = CommitLog::new();
        log.append(commit(1)).unwrap();
        let err = log.append(commit(3)).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_validate_detects_gap() {
        let mut log = CommitLog::new();
        log.append(commit(1)).unwrap();
        log.append(commit(2)).unwrap();
        log.commits[1].id = 7; // simulate a tampered record
        assert!(log.validate().unwrap_err().is_corruption());
    }

    #[test]
    fn test_get_unknown_id() {
        let log = CommitLog::new();
        assert!(log.get(0).is_none());
        assert!(log.get(1).is_none());
    }

    #[test]
    fn test_parse_commit_id() {
        assert_eq!(parse_commit_id("c12").unwrap(), 12);
        assert_eq!(parse_commit_id("4").unwrap(), 4);
        assert!(parse_commit_id("c0").is_err());
        assert!(parse_commit_id("head").is_err());
        assert!(parse_commit_id("").is_err());
    }
}
