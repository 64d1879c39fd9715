// error.rs — Error types for the typo reporting subsystem.
//
// Not-found ids and rejected transitions are NOT errors here: they come
// back as `None` / `Transition::Rejected`. Only malformed input and
// storage failures reach the caller as `Err`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during typo reporting operations.
#[derive(Debug, Error)]
pub enum TypoError {
    /// A required report field is missing or malformed. Raised before
    /// anything is written to the store.
    #[error("invalid typo report: field '{field}' {reason}")]
    Validation { field: &'static str, reason: String },

    /// The backing store failed (connection, constraint, I/O).
    #[error("typo store error: {0}")]
    Storage(String),

    /// A stored value could not be decoded.
    #[error("corrupt typo record {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    /// An activity log file operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize an activity record.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TypoError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        TypoError::Validation {
            field,
            reason: reason.into(),
        }
    }
}
