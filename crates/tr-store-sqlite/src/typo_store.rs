// typo_store.rs — TypoStore over the `typos` table.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tr_typo::{
    NewTypo, Page, PageRequest, SortDirection, SortKey, Typo, TypoError, TypoId, TypoReport,
    TypoStatus, TypoStore, WorkspaceId,
};

use crate::{from_micros, lock, to_micros, SharedConnection, SqliteStoreError};

const SELECT_COLUMNS: &str = "SELECT id, workspace_id, status, page_url, report_text, \
     suggested_fix, text_before, text_after, reporter_name, reporter_comment, \
     created_at_us, updated_at_us FROM typos";

// CASE keeps status ordering in lifecycle order rather than alphabetical.
const STATUS_RANK: &str = "CASE status WHEN 'REPORTED' THEN 0 WHEN 'IN_PROGRESS' THEN 1 \
     WHEN 'RESOLVED' THEN 2 ELSE 3 END";

fn order_clause(key: SortKey, direction: SortDirection) -> String {
    let dir = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    match key {
        SortKey::CreatedAt => format!("ORDER BY created_at_us {dir}, id {dir}"),
        SortKey::Id => format!("ORDER BY id {dir}"),
        SortKey::Status => format!("ORDER BY {STATUS_RANK} {dir}, id {dir}"),
    }
}

/// A row as read, before the status text and timestamps are checked.
struct RawTypo {
    id: i64,
    workspace_id: i64,
    status: String,
    report: TypoReport,
    created_at_us: i64,
    updated_at_us: i64,
}

impl RawTypo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            status: row.get(2)?,
            report: TypoReport {
                page_url: row.get(3)?,
                report_text: row.get(4)?,
                suggested_fix: row.get(5)?,
                text_before: row.get(6)?,
                text_after: row.get(7)?,
                reporter_name: row.get(8)?,
                reporter_comment: row.get(9)?,
            },
            created_at_us: row.get(10)?,
            updated_at_us: row.get(11)?,
        })
    }

    fn into_typo(self) -> Result<Typo, TypoError> {
        let status: TypoStatus = self.status.parse().map_err(|e| TypoError::Corrupt {
            id: self.id,
            reason: format!("{e}"),
        })?;
        let id = self.id;
        let timestamp = |column: &str, us: i64| {
            from_micros(us).ok_or_else(|| TypoError::Corrupt {
                id,
                reason: format!("{column} {us} is out of range"),
            })
        };
        Ok(Typo {
            id,
            workspace_id: self.workspace_id,
            status,
            created_at: timestamp("created_at_us", self.created_at_us)?,
            updated_at: timestamp("updated_at_us", self.updated_at_us)?,
            report: self.report,
        })
    }
}

fn select_by_id(conn: &Connection, id: TypoId) -> Result<Option<Typo>, TypoError> {
    let raw = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            RawTypo::from_row,
        )
        .optional()
        .map_err(SqliteStoreError::from)?;
    raw.map(RawTypo::into_typo).transpose()
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// SQLite-backed [`TypoStore`].
pub struct SqliteTypoStore {
    conn: SharedConnection,
}

impl SqliteTypoStore {
    pub(crate) fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl TypoStore for SqliteTypoStore {
    fn insert(&self, new: NewTypo) -> Result<Typo, TypoError> {
        let conn = lock(&self.conn)?;
        let created = to_micros(new.created_at);
        let r = &new.report;
        conn.execute(
            "INSERT INTO typos (workspace_id, status, page_url, report_text, suggested_fix, \
             text_before, text_after, reporter_name, reporter_comment, created_at_us, updated_at_us) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                new.workspace_id,
                new.status.as_str(),
                r.page_url,
                r.report_text,
                r.suggested_fix,
                r.text_before,
                r.text_after,
                r.reporter_name,
                r.reporter_comment,
                created,
            ],
        )
        .map_err(SqliteStoreError::from)?;

        let id = conn.last_insert_rowid();
        select_by_id(&conn, id)?
            .ok_or_else(|| TypoError::Storage(format!("inserted typo {id} vanished")))
    }

    fn find_by_id(&self, id: TypoId) -> Result<Option<Typo>, TypoError> {
        select_by_id(&*lock(&self.conn)?, id)
    }

    fn exists_by_id(&self, id: TypoId) -> Result<bool, TypoError> {
        let conn = lock(&self.conn)?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM typos WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(SqliteStoreError::from)?;
        Ok(found.is_some())
    }

    fn find_page_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
        request: &PageRequest,
    ) -> Result<Page<Typo>, TypoError> {
        let mut conn = lock(&self.conn)?;
        // One read transaction so the count and the rows see the same snapshot.
        let tx = conn.transaction().map_err(SqliteStoreError::from)?;
        let total: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM typos WHERE workspace_id = ?1",
                params![workspace_id],
                |row| row.get(0),
            )
            .map_err(SqliteStoreError::from)?;

        let sql = format!(
            "{SELECT_COLUMNS} WHERE workspace_id = ?1 {} LIMIT ?2 OFFSET ?3",
            order_clause(request.sort, request.direction)
        );
        let raws = {
            let mut stmt = tx.prepare(&sql).map_err(SqliteStoreError::from)?;
            let rows = stmt
                .query_map(
                    params![workspace_id, clamp(request.size), clamp(request.offset())],
                    RawTypo::from_row,
                )
                .map_err(SqliteStoreError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(SqliteStoreError::from)?;
            rows
        };
        tx.commit().map_err(SqliteStoreError::from)?;

        let content = raws
            .into_iter()
            .map(RawTypo::into_typo)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(content, request, u64::try_from(total).unwrap_or(0)))
    }

    fn find_first_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
        direction: SortDirection,
    ) -> Result<Option<Typo>, TypoError> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "{SELECT_COLUMNS} WHERE workspace_id = ?1 {} LIMIT 1",
            order_clause(SortKey::CreatedAt, direction)
        );
        let raw = conn
            .query_row(&sql, params![workspace_id], RawTypo::from_row)
            .optional()
            .map_err(SqliteStoreError::from)?;
        raw.map(RawTypo::into_typo).transpose()
    }

    fn count_by_status(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<(TypoStatus, u64)>, TypoError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT status, COUNT(*) FROM typos WHERE workspace_id = ?1 \
                 GROUP BY status HAVING COUNT(*) > 0",
            )
            .map_err(SqliteStoreError::from)?;
        let rows = stmt
            .query_map(params![workspace_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(SqliteStoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(SqliteStoreError::from)?;

        let mut counts = rows
            .into_iter()
            .map(|(status, count)| -> Result<(TypoStatus, u64), TypoError> {
                let status = status.parse::<TypoStatus>().map_err(|e| TypoError::Corrupt {
                    id: -1,
                    reason: format!("{e} in workspace {workspace_id}"),
                })?;
                Ok((status, u64::try_from(count).unwrap_or(0)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        counts.sort_by_key(|(status, _)| *status);
        Ok(counts)
    }

    fn update_status(
        &self,
        id: TypoId,
        decide: &mut dyn FnMut(TypoStatus) -> Option<TypoStatus>,
    ) -> Result<Option<Typo>, TypoError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::from)?;

        let Some(current) = select_by_id(&tx, id)? else {
            return Ok(None);
        };

        let result = match decide(current.status) {
            Some(next) if next != current.status => {
                tx.execute(
                    "UPDATE typos SET status = ?1, updated_at_us = ?2 WHERE id = ?3",
                    params![next.as_str(), to_micros(Utc::now()), id],
                )
                .map_err(SqliteStoreError::from)?;
                select_by_id(&tx, id)?
            }
            _ => Some(current),
        };

        tx.commit().map_err(SqliteStoreError::from)?;
        Ok(result)
    }

    fn delete_by_id(&self, id: TypoId) -> Result<u64, TypoError> {
        let conn = lock(&self.conn)?;
        let affected = conn
            .execute("DELETE FROM typos WHERE id = ?1", params![id])
            .map_err(SqliteStoreError::from)?;
        Ok(affected as u64)
    }
}
