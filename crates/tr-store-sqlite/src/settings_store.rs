// settings_store.rs — SettingsStore over the `workspace_settings` table.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tr_workspace::{
    ApiAccessToken, SettingsId, SettingsStore, WorkspaceError, WorkspaceId, WorkspaceSettings,
};

use crate::{from_micros, lock, to_micros, SharedConnection, SqliteStoreError};

const SELECT_COLUMNS: &str =
    "SELECT id, workspace_id, api_access_token, updated_at_us FROM workspace_settings";

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, i64, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_settings(
    (id, workspace_id, token, updated_at_us): (i64, i64, String, i64),
) -> Result<WorkspaceSettings, WorkspaceError> {
    let api_access_token: ApiAccessToken = token.parse().map_err(|_| {
        WorkspaceError::Storage(format!("settings row {id} holds an unreadable token"))
    })?;
    let updated_at = from_micros(updated_at_us).ok_or_else(|| {
        WorkspaceError::Storage(format!(
            "settings row {id} has out-of-range updated_at_us {updated_at_us}"
        ))
    })?;
    Ok(WorkspaceSettings {
        id,
        workspace_id,
        api_access_token,
        updated_at,
    })
}

fn select_where(
    conn: &Connection,
    clause: &str,
    key: i64,
) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
    let raw = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE {clause} = ?1"),
            params![key],
            raw_from_row,
        )
        .optional()
        .map_err(SqliteStoreError::from)?;
    raw.map(into_settings).transpose()
}

/// SQLite-backed [`SettingsStore`].
pub struct SqliteSettingsStore {
    conn: SharedConnection,
}

impl SqliteSettingsStore {
    pub(crate) fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn find_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
        select_where(&*lock(&self.conn)?, "workspace_id", workspace_id)
    }

    fn find_by_id(&self, id: SettingsId) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
        select_where(&*lock(&self.conn)?, "id", id)
    }

    fn insert_or_get(
        &self,
        workspace_id: WorkspaceId,
        token: ApiAccessToken,
    ) -> Result<WorkspaceSettings, WorkspaceError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::from)?;

        if let Some(existing) = select_where(&tx, "workspace_id", workspace_id)? {
            return Ok(existing);
        }
        tx.execute(
            "INSERT INTO workspace_settings (workspace_id, api_access_token, updated_at_us) \
             VALUES (?1, ?2, ?3)",
            params![workspace_id, token.to_string(), to_micros(Utc::now())],
        )
        .map_err(SqliteStoreError::from)?;
        let created = select_where(&tx, "workspace_id", workspace_id)?.ok_or_else(|| {
            WorkspaceError::Storage(format!("settings for workspace {workspace_id} vanished"))
        })?;

        tx.commit().map_err(SqliteStoreError::from)?;
        Ok(created)
    }

    fn replace_token(
        &self,
        workspace_id: WorkspaceId,
        next: &mut dyn FnMut(&ApiAccessToken) -> ApiAccessToken,
    ) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::from)?;

        let Some(current) = select_where(&tx, "workspace_id", workspace_id)? else {
            return Ok(None);
        };
        let token = next(&current.api_access_token);
        tx.execute(
            "UPDATE workspace_settings SET api_access_token = ?1, updated_at_us = ?2 \
             WHERE workspace_id = ?3",
            params![token.to_string(), to_micros(Utc::now()), workspace_id],
        )
        .map_err(SqliteStoreError::from)?;
        let updated = select_where(&tx, "workspace_id", workspace_id)?;

        tx.commit().map_err(SqliteStoreError::from)?;
        Ok(updated)
    }
}
