// src/error.rs

//! Crate-level error type for devsync
//!
//! One enum covers the whole error taxonomy:
//! - integrity failures (checksum mismatch) are fatal for one component,
//! - name collisions are fatal for one component,
//! - a corrupt ledger is fatal for the whole run and is never treated as
//!   an empty ledger,
//! - everything else wraps the underlying I/O or path problem.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by devsync operations
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Content did not match a required checksum
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Same identity already installed from a different source
    #[error(
        "name collision for '{identity}': already installed from {existing_source}, \
         incoming from {incoming_source}"
    )]
    Collision {
        identity: String,
        existing_source: String,
        incoming_source: String,
    },

    /// The installation ledger exists but cannot be parsed
    #[error("installation ledger at {path} is corrupt: {reason}")]
    LedgerCorrupt { path: PathBuf, reason: String },

    /// A conflict verdict requires an explicit strategy and none was given
    #[error("'{identity}' is {verdict}; an explicit resolution strategy is required")]
    StrategyRequired { identity: String, verdict: String },

    /// Path escapes the project root or is otherwise unusable
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A requested component or backup does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Failed to serialize state for persistence
    #[error("serialization failed: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_checksum_mismatch() {
        let err = Error::ChecksumMismatch {
            expected: "sha256:aa".to_string(),
            actual: "sha256:bb".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: expected sha256:aa, got sha256:bb"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_collision_names_both_sources() {
        let err = Error::Collision {
            identity: "python-style".to_string(),
            existing_source: "github.com/a/pkg".to_string(),
            incoming_source: "github.com/b/pkg".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("github.com/a/pkg"));
        assert!(msg.contains("github.com/b/pkg"));
    }
}
