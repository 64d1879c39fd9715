// service.rs — Typo reporting service.
//
// Orchestrates the store and the lifecycle engine for one deployment:
//
//   add_typo_report   validate → REPORTED → insert
//   update_typo_status  store.update_status(engine decides inside the lock)
//   delete_typo_by_id   affected-row count, idempotent
//   get_typo_page / counts / last   workspace-scoped reads
//
// Outcomes the caller should handle as normal flow (unknown id, rejected
// event, empty workspace) come back as `None`, `0` or an empty list.
// Only validation and storage failures are `Err`.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::TypoError;
use crate::events::{EventDispatcher, TypoActivity};
use crate::lifecycle::{next_status, Transition, TypoEvent, TypoStatus};
use crate::page::{Page, PageRequest, SortDirection};
use crate::store::TypoStore;
use crate::typo::{NewTypo, TypoId, TypoReport, TypoResult, WorkspaceId};

/// Tunables for the reporting service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Longest accepted value for any report text field, in characters.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,

    /// Creation-time direction used by `get_last_typo_by_workspace_id`.
    /// `asc` returns the oldest typo, `desc` the newest.
    #[serde(default)]
    pub last_typo_order: SortDirection,

    /// Page size used when a caller does not give one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_text_len: default_max_text_len(),
            last_typo_order: SortDirection::default(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_max_text_len() -> usize {
    1000
}

fn default_page_size() -> u64 {
    20
}

/// The typo reporting service.
pub struct TypoService<S: TypoStore + ?Sized> {
    store: Arc<S>,
    config: ServiceConfig,
    dispatcher: EventDispatcher,
}

impl<S: TypoStore + ?Sized> TypoService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: ServiceConfig) -> Self {
        Self {
            store,
            config,
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate and store a new report. The typo always starts as REPORTED.
    pub fn add_typo_report(
        &self,
        report: TypoReport,
        workspace_id: WorkspaceId,
    ) -> Result<TypoResult, TypoError> {
        report.validate(self.config.max_text_len)?;

        let typo = self.store.insert(NewTypo::reported(workspace_id, report))?;
        tracing::info!(
            typo_id = typo.id,
            workspace_id,
            "typo reported on {}",
            typo.report.page_url
        );
        self.dispatcher.dispatch(&TypoActivity::Reported {
            typo_id: typo.id,
            workspace_id,
            page_url: typo.report.page_url.clone(),
            timestamp: typo.created_at,
        });
        Ok(typo.into())
    }

    /// One page of the workspace's typos.
    pub fn get_typo_page(
        &self,
        request: &PageRequest,
        workspace_id: WorkspaceId,
    ) -> Result<Page<TypoResult>, TypoError> {
        let page = self.store.find_page_by_workspace_id(workspace_id, request)?;
        Ok(page.map(TypoResult::from))
    }

    /// Look a typo up through its workspace. An id owned by another
    /// workspace is reported as not found.
    pub fn get_typo_by_id(
        &self,
        id: TypoId,
        workspace_id: WorkspaceId,
    ) -> Result<Option<TypoResult>, TypoError> {
        Ok(self
            .store
            .find_by_id(id)?
            .filter(|t| t.workspace_id == workspace_id)
            .map(TypoResult::from))
    }

    /// Apply `event` to the typo's current status.
    ///
    /// Returns `None` for an unknown id. Otherwise returns the typo as it
    /// stands afterwards: moved on success, unchanged for a missing event
    /// or a rejected one.
    pub fn update_typo_status(
        &self,
        id: TypoId,
        event: Option<TypoEvent>,
    ) -> Result<Option<TypoResult>, TypoError> {
        Ok(self
            .update_typo_status_with_outcome(id, event)?
            .map(|(typo, _)| typo))
    }

    /// [`update_typo_status`](Self::update_typo_status) plus the engine's
    /// verdict, decided against the status read inside the store's atomic
    /// update.
    pub fn update_typo_status_with_outcome(
        &self,
        id: TypoId,
        event: Option<TypoEvent>,
    ) -> Result<Option<(TypoResult, Transition)>, TypoError> {
        let mut outcome = None;
        let updated = self.store.update_status(id, &mut |current| {
            let transition = next_status(current, event);
            outcome = Some(transition);
            transition.changes_status().then(|| transition.status())
        })?;

        let Some(typo) = updated else {
            tracing::debug!(typo_id = id, "status update for unknown typo");
            return Ok(None);
        };

        match (outcome, event) {
            (Some(Transition::Applied { from, to }), Some(event)) => {
                tracing::info!(typo_id = id, %event, "typo status {} -> {}", from, to);
                self.dispatcher.dispatch(&TypoActivity::StatusChanged {
                    typo_id: id,
                    workspace_id: typo.workspace_id,
                    event,
                    from,
                    to,
                    timestamp: Utc::now(),
                });
            }
            (Some(Transition::Rejected { status, event }), _) => {
                tracing::warn!(
                    typo_id = id,
                    %event,
                    "transition not permitted from status {}",
                    status
                );
                self.dispatcher.dispatch(&TypoActivity::TransitionRejected {
                    typo_id: id,
                    workspace_id: typo.workspace_id,
                    event,
                    status,
                    timestamp: Utc::now(),
                });
            }
            _ => tracing::debug!(typo_id = id, status = %typo.status, "status read without event"),
        }

        let transition = outcome.unwrap_or(Transition::Unchanged(typo.status));
        Ok(Some((typo.into(), transition)))
    }

    /// `update_typo_status` for transports that address typos through a
    /// workspace. An id owned by another workspace is not found.
    pub fn update_typo_status_in_workspace(
        &self,
        id: TypoId,
        workspace_id: WorkspaceId,
        event: Option<TypoEvent>,
    ) -> Result<Option<TypoResult>, TypoError> {
        if self.get_typo_by_id(id, workspace_id)?.is_none() {
            return Ok(None);
        }
        self.update_typo_status(id, event)
    }

    /// Delete a typo. Returns 1 if it existed, 0 otherwise.
    pub fn delete_typo_by_id(&self, id: TypoId) -> Result<u64, TypoError> {
        let deleted = self.store.delete_by_id(id)?;
        if deleted > 0 {
            tracing::info!(typo_id = id, "typo deleted");
            self.dispatcher.dispatch(&TypoActivity::Deleted {
                typo_id: id,
                timestamp: Utc::now(),
            });
        }
        Ok(deleted)
    }

    /// `delete_typo_by_id` restricted to typos of `workspace_id`.
    pub fn delete_typo_in_workspace(
        &self,
        id: TypoId,
        workspace_id: WorkspaceId,
    ) -> Result<u64, TypoError> {
        if self.get_typo_by_id(id, workspace_id)?.is_none() {
            return Ok(0);
        }
        self.delete_typo_by_id(id)
    }

    /// Per-status counts for a workspace; statuses without typos are left out.
    pub fn get_count_typo_by_status_for_workspace_id(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<(TypoStatus, u64)>, TypoError> {
        self.store.count_by_status(workspace_id)
    }

    /// The workspace's first typo by creation time, in the configured
    /// `last_typo_order` direction.
    pub fn get_last_typo_by_workspace_id(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<TypoResult>, TypoError> {
        Ok(self
            .store
            .find_first_by_workspace_id(workspace_id, self.config.last_typo_order)?
            .map(TypoResult::from))
    }
}
