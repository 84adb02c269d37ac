//! Error types for catalog media.
//!
//! One enum covers the whole taxonomy: validation and lookup failures are
//! rejected before any mutation, file failures trigger the documented
//! compensating moves, and `StoreAfterMove` marks the single case where a
//! file was moved but its row could not be finalized.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where in an operation a file-store failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePhase {
    Upload,
    Delete,
    Quarantine,
    Commit,
    Rollback,
    Prepare,
}

impl fmt::Display for FilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilePhase::Upload => "upload",
            FilePhase::Delete => "delete",
            FilePhase::Quarantine => "quarantine",
            FilePhase::Commit => "commit",
            FilePhase::Rollback => "rollback",
            FilePhase::Prepare => "prepare",
        };
        f.write_str(name)
    }
}

/// Main error type for catalog media operations.
#[derive(Debug, Error)]
pub enum MediaError {
    // Rejected before mutation
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Media asset not found: {id}")]
    AssetNotFound { id: i64 },

    // File store
    #[error("File operation failed during {phase} (asset {asset_id:?}) at {path:?}: {message}")]
    FileOperation {
        phase: FilePhase,
        asset_id: Option<i64>,
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Rename left {failed} asset(s) of {entity} at their previous paths")]
    PartialRename { entity: String, failed: usize },

    #[error("File for asset {asset_id} moved to {path:?} but its row was not updated: {message}")]
    StoreAfterMove {
        asset_id: i64,
        path: PathBuf,
        message: String,
    },

    // Relational store
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for catalog media operations.
pub type Result<T> = std::result::Result<T, MediaError>;

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MediaError {
    fn from(err: rusqlite::Error) -> Self {
        MediaError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MediaError {
    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MediaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap an IO error from a file-store primitive with phase and path context.
    pub fn file_op(
        phase: FilePhase,
        asset_id: Option<i64>,
        path: impl Into<PathBuf>,
        err: std::io::Error,
    ) -> Self {
        MediaError::FileOperation {
            phase,
            asset_id,
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32000: timeout
    /// - -32002: asset not found
    /// - -32003: file operation failed (retryable)
    /// - -32005: validation error
    /// - -32603: internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            MediaError::Timeout(_) => -32000,
            MediaError::AssetNotFound { .. } => -32002,
            MediaError::FileOperation { .. } | MediaError::PartialRename { .. } => -32003,
            MediaError::Validation { .. } => -32005,
            _ => -32603,
        }
    }

    /// Check if the caller may restart the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MediaError::FileOperation { .. }
                | MediaError::PartialRename { .. }
                | MediaError::Timeout(_)
                | MediaError::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MediaError::AssetNotFound { id: 42 };
        assert_eq!(err.to_string(), "Media asset not found: 42");

        let err = MediaError::validation("order", "must not be empty");
        assert_eq!(err.to_string(), "Validation error for order: must not be empty");
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(MediaError::AssetNotFound { id: 1 }.to_rpc_error_code(), -32002);
        assert_eq!(MediaError::validation("x", "y").to_rpc_error_code(), -32005);
        assert_eq!(
            MediaError::StoreAfterMove {
                asset_id: 1,
                path: PathBuf::from("/tmp/a.jpg"),
                message: "locked".into(),
            }
            .to_rpc_error_code(),
            -32603
        );
    }

    #[test]
    fn test_retryable_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(MediaError::file_op(FilePhase::Quarantine, Some(3), "/x", io).is_retryable());
        assert!(MediaError::PartialRename {
            entity: "modules/7".into(),
            failed: 1
        }
        .is_retryable());
        assert!(!MediaError::AssetNotFound { id: 1 }.is_retryable());
        assert!(!MediaError::StoreAfterMove {
            asset_id: 1,
            path: PathBuf::from("/x"),
            message: "m".into(),
        }
        .is_retryable());
    }
}
