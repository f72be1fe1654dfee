//! Error types for the Relic library
//!
//! This module defines all error types that can occur during Relic operations.
//! Every core operation returns a typed [`Result`]; the CLI layer decides how
//! errors are presented and which exit code they map to.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the Relic library
pub type Result<T> = std::result::Result<T, RelicError>;

/// Main error type for all Relic operations
#[derive(Debug, Error)]
pub enum RelicError {
    /// Repository has not been initialized at the given root
    #[error("repository not initialized at {path:?} (run `relic init` first)")]
    NotInitialized {
        /// Repository root that was probed
        path: PathBuf,
    },

    /// Repository metadata already exists at the given root
    #[error("repository already initialized at {path:?}")]
    AlreadyInitialized {
        /// Repository root that was probed
        path: PathBuf,
    },

    /// I/O error tied to a specific path
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// Path where the failure occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Symbolic link chain loops back on itself
    #[error("symlink cycle detected at {path:?}")]
    Cycle {
        /// Path of the link that closed the cycle
        path: PathBuf,
    },

    /// The working tree matches the head snapshot exactly
    #[error("nothing to commit, working tree clean")]
    NothingToCommit,

    /// Commit id does not exist in the log
    #[error("unknown commit: {id}")]
    UnknownCommit {
        /// The id as given by the caller
        id: String,
    },

    /// Persisted state failed structural validation on load
    #[error("corrupt repository state: {0}")]
    CorruptState(String),

    /// Another commit or restore holds the repository lock
    #[error("repository is locked ({path:?} exists); another operation may be in progress")]
    Locked {
        /// Path of the lock file
        path: PathBuf,
    },

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal error from the walkdir crate
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl RelicError {
    /// Create an [`RelicError::Io`] tying an `io::Error` to the path it hit
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RelicError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a [`RelicError::CorruptState`] with a custom message
    pub fn corrupt(msg: impl Into<String>) -> Self {
        RelicError::CorruptState(msg.into())
    }

    /// Check if this error was caused by user input or repository misuse
    ///
    /// User errors (bad commit id, committing a clean tree, operating on an
    /// uninitialized root) map to exit code 1 in the CLI; everything else is
    /// a system error and maps to exit code 2.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RelicError::NotInitialized { .. }
                | RelicError::AlreadyInitialized { .. }
                | RelicError::NothingToCommit
                | RelicError::UnknownCommit { .. }
        )
    }

    /// Check if this error indicates corrupt or inconsistent persisted state
    pub fn is_corruption(&self) -> bool {
        matches!(self, RelicError::CorruptState(_))
    }
}
