// store.rs — TypoStore trait and the in-memory implementation.
//
// The TypoStore trait is the repository boundary for typos. The reporting
// service only talks to this trait, so the backend (in-memory here, SQLite
// in tr-store-sqlite) can be swapped without touching the service.
//
// Every read-modify-write goes through `update_status`, which hands the
// current status to a caller-supplied closure while the record is locked.
// A concurrent reader either sees the old status or the new one, never a
// half-applied change.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::TypoError;
use crate::lifecycle::TypoStatus;
use crate::page::{Page, PageRequest, SortDirection, SortKey};
use crate::typo::{NewTypo, Typo, TypoId, WorkspaceId};

/// Repository contract for typo records.
///
/// Implementations must be shareable across request threads.
pub trait TypoStore: Send + Sync {
    /// Insert a new typo and return it with its assigned id.
    fn insert(&self, new: NewTypo) -> Result<Typo, TypoError>;

    /// Point lookup by id.
    fn find_by_id(&self, id: TypoId) -> Result<Option<Typo>, TypoError>;

    fn exists_by_id(&self, id: TypoId) -> Result<bool, TypoError> {
        Ok(self.find_by_id(id)?.is_some())
    }

    /// One page of the typos belonging to `workspace_id`.
    fn find_page_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
        request: &PageRequest,
    ) -> Result<Page<Typo>, TypoError>;

    /// First typo of the workspace after sorting by creation time in
    /// `direction` (ties broken by id in the same direction).
    fn find_first_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
        direction: SortDirection,
    ) -> Result<Option<Typo>, TypoError>;

    /// Count per status for one workspace. Statuses with no typos are omitted.
    fn count_by_status(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<(TypoStatus, u64)>, TypoError>;

    /// Atomically load the typo, ask `decide` for a new status, and write it
    /// if `decide` returns one. Returns the typo as it stands afterwards, or
    /// `None` if the id does not exist (in which case `decide` is not called).
    fn update_status(
        &self,
        id: TypoId,
        decide: &mut dyn FnMut(TypoStatus) -> Option<TypoStatus>,
    ) -> Result<Option<Typo>, TypoError>;

    /// Delete by id. Returns the number of rows removed (0 or 1).
    fn delete_by_id(&self, id: TypoId) -> Result<u64, TypoError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: TypoId,
    rows: BTreeMap<TypoId, Typo>,
}

/// In-process TypoStore. Used by tests and by tools that do not need
/// durability.
#[derive(Debug, Default)]
pub struct MemoryTypoStore {
    state: Mutex<MemoryState>,
}

impl MemoryTypoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, TypoError> {
        self.state
            .lock()
            .map_err(|_| TypoError::Storage("typo store lock poisoned".to_string()))
    }

    fn workspace_rows(state: &MemoryState, workspace_id: WorkspaceId) -> Vec<Typo> {
        state
            .rows
            .values()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect()
    }
}

fn sort_typos(typos: &mut [Typo], key: SortKey, direction: SortDirection) {
    typos.sort_by(|a, b| {
        let ord = match key {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Status => a.status.cmp(&b.status).then(a.id.cmp(&b.id)),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

impl TypoStore for MemoryTypoStore {
    fn insert(&self, new: NewTypo) -> Result<Typo, TypoError> {
        let mut state = self.lock()?;
        state.last_id += 1;
        let typo = Typo::from_new(state.last_id, new);
        state.rows.insert(typo.id, typo.clone());
        Ok(typo)
    }

    fn find_by_id(&self, id: TypoId) -> Result<Option<Typo>, TypoError> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn find_page_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
        request: &PageRequest,
    ) -> Result<Page<Typo>, TypoError> {
        let mut typos = Self::workspace_rows(&*self.lock()?, workspace_id);
        let total = typos.len() as u64;
        sort_typos(&mut typos, request.sort, request.direction);

        let content = typos
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.size).unwrap_or(usize::MAX))
            .collect();
        Ok(Page::new(content, request, total))
    }

    fn find_first_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
        direction: SortDirection,
    ) -> Result<Option<Typo>, TypoError> {
        let mut typos = Self::workspace_rows(&*self.lock()?, workspace_id);
        sort_typos(&mut typos, SortKey::CreatedAt, direction);
        Ok(typos.into_iter().next())
    }

    fn count_by_status(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<(TypoStatus, u64)>, TypoError> {
        let state = self.lock()?;
        let mut counts: BTreeMap<TypoStatus, u64> = BTreeMap::new();
        for typo in state.rows.values().filter(|t| t.workspace_id == workspace_id) {
            *counts.entry(typo.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    fn update_status(
        &self,
        id: TypoId,
        decide: &mut dyn FnMut(TypoStatus) -> Option<TypoStatus>,
    ) -> Result<Option<Typo>, TypoError> {
        let mut state = self.lock()?;
        let Some(typo) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(next) = decide(typo.status) {
            if next != typo.status {
                typo.status = next;
                typo.updated_at = Utc::now();
            }
        }
        Ok(Some(typo.clone()))
    }

    fn delete_by_id(&self, id: TypoId) -> Result<u64, TypoError> {
        Ok(u64::from(self.lock()?.rows.remove(&id).is_some()))
    }
}
