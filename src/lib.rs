//! # Relic - Minimal change tracking and snapshot restore
//!
//! Relic is a local, single-user version-control core for a directory tree.
//! It fingerprints tracked files, classifies what was added, modified, or
//! deleted since the last recorded state, materializes that into an immutable
//! commit record, and can restore the tree toward an earlier recorded state.
//!
//! ## Overview
//!
//! - **Change detection**: byte-exact SHA-256 fingerprints per tracked file;
//!   comparing two snapshots classifies every path deterministically
//! - **Commit log**: append-only, sequential gap-free ids (`c1`, `c2`, …),
//!   each commit carrying its change set and the head snapshot at that point
//! - **Restore**: deletion replay over the base snapshot — an intentionally
//!   partial reconstruction whose limits are reported, never hidden
//! - **Ignore rules**: built-in defaults merged with a repository-local
//!   `.relicignore`; ignored subtrees are pruned before descent
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relic::Repository;
//!
//! # fn main() -> relic::Result<()> {
//! // Initialize tracking for a directory
//! let mut repo = Repository::init("./my_project")?;
//!
//! // ... edit some files ...
//!
//! // See what changed since the last recorded state
//! let status = repo.status()?;
//! println!("{} changed paths", status.changes.total());
//!
//! // Record the changes
//! let commit = repo.commit(Some("first batch of edits"))?;
//! println!("committed {}", commit.label());
//!
//! // Later: roll the tree back toward that commit
//! let report = repo.restore(&commit.label())?;
//! println!("kept {}, removed {}", report.files_kept, report.files_removed);
//! # Ok(())
//! # }
//! ```
//!
//! ## What restore does (and does not) guarantee
//!
//! Relic stores fingerprints plus two content caches (the base snapshot taken
//! at init and the current head), not per-commit file contents. Restoring to
//! `cN` trims the tree to `base ∖ deletions(c1..=cN)`: files deleted after
//! the target come back with their *base* content, files modified after the
//! target keep their *latest* content, and files that were added after init
//! and since deleted cannot be resurrected at all. The
//! [`RestoreReport`](restore::RestoreReport) lists both of the lossy cases
//! explicitly.
//!
//! ## Module Organization
//!
//! - [`repository`]: the [`Repository`] handle tying everything together
//! - [`snapshot`]: state snapshots and the directory scanner
//! - [`changes`]: change classification between snapshots
//! - [`log`]: the append-only commit log
//! - [`restore`]: the deletion-replay restore engine
//! - [`diff`]: line-level diffs against cached head content
//! - [`ignore`]: ignore rules and matching
//! - [`storage`]: the persisted `.relic` layout
//! - [`error`]: error types and classification

pub mod changes;
pub mod diff;
pub mod error;
pub mod ignore;
pub mod log;
pub mod repository;
pub mod restore;
pub mod snapshot;
pub mod storage;

mod fingerprint;
mod utils;

pub use changes::{ChangeKind, ChangeSet};
pub use diff::{DiffHunk, DiffOptions, FileDiff, LineChange};
pub use error::{RelicError, Result};
pub use ignore::IgnoreMatcher;
pub use log::{Commit, CommitLog};
pub use repository::{Repository, StatusReport};
pub use restore::RestoreReport;
pub use snapshot::{ScanWarning, StateSnapshot};
pub use storage::RepoConfig;
