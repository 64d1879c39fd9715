//! # tr-store-sqlite
//!
//! SQLite backend for the Typo Reporter repositories.
//!
//! One [`SqliteDatabase`] owns a single connection behind a mutex and hands
//! out a [`SqliteTypoStore`] and a [`SqliteSettingsStore`] that share it.
//! Read-modify-write operations run in `BEGIN IMMEDIATE` transactions, so
//! readers only ever see committed state.
//!
//! Runtime pragmas follow the usual defaults for a small embedded store:
//! WAL journal, `synchronous = NORMAL`, and a configurable busy timeout.

pub mod error;
pub mod schema;
pub mod settings_store;
pub mod typo_store;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub use error::SqliteStoreError;
pub use settings_store::SqliteSettingsStore;
pub use typo_store::SqliteTypoStore;

/// Busy timeout used when the caller does not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SharedConnection = Arc<Mutex<Connection>>;

/// An open database shared by both stores.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: SharedConnection,
}

impl SqliteDatabase {
    /// Open (or create) the database file, apply pragmas and create tables.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, SqliteStoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SqliteStoreError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let _journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::init(conn, busy_timeout)
    }

    /// A private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        Self::init(Connection::open_in_memory()?, DEFAULT_BUSY_TIMEOUT)
    }

    fn init(conn: Connection, busy_timeout: Duration) -> Result<Self, SqliteStoreError> {
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(busy_timeout)?;
        schema::apply(&conn)?;
        tracing::debug!("sqlite schema v{} ready", schema::SCHEMA_VERSION);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn typo_store(&self) -> SqliteTypoStore {
        SqliteTypoStore::new(Arc::clone(&self.conn))
    }

    pub fn settings_store(&self) -> SqliteSettingsStore {
        SqliteSettingsStore::new(Arc::clone(&self.conn))
    }
}

fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
    conn.lock().map_err(|_| SqliteStoreError::LockPoisoned)
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

/// `None` when the stored value is outside chrono's range.
fn from_micros(us: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(us)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_dirs_and_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tr.sqlite3");
        let db = SqliteDatabase::open(&path, Duration::from_millis(250)).unwrap();
        assert!(path.exists());

        let conn = lock(&db.conn).unwrap();
        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
        let busy_timeout_ms: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout_ms, 250);
    }

    #[test]
    fn micros_round_trip() {
        let now = Utc::now();
        let back = from_micros(to_micros(now)).unwrap();
        assert_eq!(back.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn out_of_range_micros_are_rejected() {
        assert!(from_micros(i64::MAX).is_none());
    }
}
