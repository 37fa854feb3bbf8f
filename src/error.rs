//! Custom error types for autoarch
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for autoarch operations
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Persistent storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Archive specification file could not be loaded
    #[error("Invalid archive specification: {0}")]
    InvalidSpec(String),

    /// A system error occurred while the backup was being created
    #[error("Backup failed: {0}")]
    BackupFailed(String),

    /// The archiver gave up on the backup
    #[error("Backup aborted: {0}")]
    BackupAborted(String),

    /// A user command run around backups failed
    #[error("Command failed: {0}")]
    Command(String),

    /// The selected archiver cannot do what was asked
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },
}

impl ArchiveError {
    /// Create a "not found" error for an archive without stored data
    pub fn stored_data_not_found(archive: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Stored data for archive",
            identifier: archive.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an archive specification error
    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, Self::InvalidSpec(_))
    }

    /// Check if the error ended a backup creation
    pub fn is_backup_failure(&self) -> bool {
        matches!(
            self,
            Self::BackupFailed(_) | Self::BackupAborted(_) | Self::Io(_)
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<glob::PatternError> for ArchiveError {
    fn from(err: glob::PatternError) -> Self {
        Self::InvalidSpec(format!("Bad file pattern: {}", err))
    }
}

/// Result type alias for autoarch operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
