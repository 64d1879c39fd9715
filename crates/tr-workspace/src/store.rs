// store.rs — SettingsStore trait and the in-memory implementation.
//
// Token rotation goes through `replace_token`, which hands the current
// token to a closure and stores whatever it returns, all under one lock
// (one transaction for SQL backends). The old token stops matching at the
// same instant the new one starts.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::WorkspaceError;
use crate::settings::{ApiAccessToken, SettingsId, WorkspaceId, WorkspaceSettings};

/// Repository contract for workspace settings rows.
pub trait SettingsStore: Send + Sync {
    fn find_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceSettings>, WorkspaceError>;

    fn find_by_id(&self, id: SettingsId) -> Result<Option<WorkspaceSettings>, WorkspaceError>;

    /// Create the settings row for `workspace_id` with `token`, or return the
    /// existing row untouched.
    fn insert_or_get(
        &self,
        workspace_id: WorkspaceId,
        token: ApiAccessToken,
    ) -> Result<WorkspaceSettings, WorkspaceError>;

    /// Atomically replace the workspace's token with `next(current)`.
    /// Returns `None` (without calling `next`) if the workspace has no row.
    fn replace_token(
        &self,
        workspace_id: WorkspaceId,
        next: &mut dyn FnMut(&ApiAccessToken) -> ApiAccessToken,
    ) -> Result<Option<WorkspaceSettings>, WorkspaceError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: SettingsId,
    by_workspace: BTreeMap<WorkspaceId, WorkspaceSettings>,
}

/// In-process SettingsStore.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    state: Mutex<MemoryState>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, WorkspaceError> {
        self.state
            .lock()
            .map_err(|_| WorkspaceError::Storage("settings store lock poisoned".to_string()))
    }
}

impl SettingsStore for MemorySettingsStore {
    fn find_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
        Ok(self.lock()?.by_workspace.get(&workspace_id).cloned())
    }

    fn find_by_id(&self, id: SettingsId) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
        Ok(self
            .lock()?
            .by_workspace
            .values()
            .find(|s| s.id == id)
            .cloned())
    }

    fn insert_or_get(
        &self,
        workspace_id: WorkspaceId,
        token: ApiAccessToken,
    ) -> Result<WorkspaceSettings, WorkspaceError> {
        let mut state = self.lock()?;
        if let Some(existing) = state.by_workspace.get(&workspace_id) {
            return Ok(existing.clone());
        }
        state.last_id += 1;
        let settings = WorkspaceSettings {
            id: state.last_id,
            workspace_id,
            api_access_token: token,
            updated_at: Utc::now(),
        };
        state.by_workspace.insert(workspace_id, settings.clone());
        Ok(settings)
    }

    fn replace_token(
        &self,
        workspace_id: WorkspaceId,
        next: &mut dyn FnMut(&ApiAccessToken) -> ApiAccessToken,
    ) -> Result<Option<WorkspaceSettings>, WorkspaceError> {
        let mut state = self.lock()?;
        let Some(settings) = state.by_workspace.get_mut(&workspace_id) else {
            return Ok(None);
        };
        settings.api_access_token = next(&settings.api_access_token);
        settings.updated_at = Utc::now();
        Ok(Some(settings.clone()))
    }
}
