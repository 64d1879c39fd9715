// error.rs — SQLite store errors and their mapping into the domain errors.

use std::path::PathBuf;

use thiserror::Error;
use tr_typo::TypoError;
use tr_workspace::WorkspaceError;

/// Errors raised by the SQLite backend.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the database directory failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another thread panicked while holding the connection.
    #[error("sqlite connection lock poisoned")]
    LockPoisoned,
}

impl From<SqliteStoreError> for TypoError {
    fn from(e: SqliteStoreError) -> Self {
        TypoError::Storage(e.to_string())
    }
}

impl From<SqliteStoreError> for WorkspaceError {
    fn from(e: SqliteStoreError) -> Self {
        WorkspaceError::Storage(e.to_string())
    }
}
