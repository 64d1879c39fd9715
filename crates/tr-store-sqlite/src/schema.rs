// schema.rs — Table layout for the SQLite backend.
//
// Timestamps are stored as microseconds since the Unix epoch (INTEGER) so
// ordering by creation time is a plain integer comparison. AUTOINCREMENT
// keeps deleted ids from ever being handed out again.

use rusqlite::Connection;

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS typos (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id     INTEGER NOT NULL,
    status           TEXT    NOT NULL
                     CHECK (status IN ('REPORTED', 'IN_PROGRESS', 'RESOLVED', 'CANCELED')),
    page_url         TEXT    NOT NULL,
    report_text      TEXT    NOT NULL,
    suggested_fix    TEXT    NOT NULL DEFAULT '',
    text_before      TEXT    NOT NULL DEFAULT '',
    text_after       TEXT    NOT NULL DEFAULT '',
    reporter_name    TEXT    NOT NULL DEFAULT '',
    reporter_comment TEXT    NOT NULL DEFAULT '',
    created_at_us    INTEGER NOT NULL,
    updated_at_us    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_typos_workspace_created
    ON typos(workspace_id, created_at_us);
CREATE INDEX IF NOT EXISTS idx_typos_workspace_status
    ON typos(workspace_id, status);

CREATE TABLE IF NOT EXISTS workspace_settings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id     INTEGER NOT NULL UNIQUE,
    api_access_token TEXT    NOT NULL UNIQUE,
    updated_at_us    INTEGER NOT NULL
);
"#;

/// Create missing tables and stamp the schema version.
pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
