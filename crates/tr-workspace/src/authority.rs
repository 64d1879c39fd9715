// authority.rs — Workspace token authority.
//
// Reads, issues and rotates the per-workspace API access token:
//
// 1. get_token_view      → current settings id + token, or None
// 2. regenerate_token    → ADMIN only; anything else is Unauthorized and
//                          the stored token is not touched
// 3. authenticate_basic  → Basic credentials → owning workspace, or None
//
// Rotation happens inside a single store operation, so there is never a
// moment where both the old and the new token match, or neither does.

use std::sync::Arc;

use crate::error::WorkspaceError;
use crate::gate::{AuthorizationGate, Role};
use crate::settings::{parse_basic_credentials, ApiAccessToken, TokenView, WorkspaceId};
use crate::store::SettingsStore;

/// Issues, rotates and checks workspace API tokens.
pub struct TokenAuthority<S: SettingsStore + ?Sized> {
    store: Arc<S>,
}

impl<S: SettingsStore + ?Sized> TokenAuthority<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current token view, or `None` if the workspace has no settings row.
    pub fn get_token_view(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<TokenView>, WorkspaceError> {
        Ok(self
            .store
            .find_by_workspace_id(workspace_id)?
            .map(|s| s.token_view()))
    }

    /// Create the workspace's settings row with a fresh token. Returns the
    /// existing view if the row is already there.
    pub fn provision(&self, workspace_id: WorkspaceId) -> Result<TokenView, WorkspaceError> {
        let settings = self
            .store
            .insert_or_get(workspace_id, ApiAccessToken::generate())?;
        tracing::info!(workspace_id, settings_id = settings.id, "workspace settings ready");
        Ok(settings.token_view())
    }

    /// Replace the workspace's token with a fresh one.
    ///
    /// Fails with [`WorkspaceError::Unauthorized`] unless `caller_role` is
    /// ADMIN. Returns `Ok(None)` if the workspace has no settings row.
    pub fn regenerate_token(
        &self,
        workspace_id: WorkspaceId,
        caller_role: Role,
    ) -> Result<Option<TokenView>, WorkspaceError> {
        if !caller_role.is_admin() {
            tracing::warn!(workspace_id, role = %caller_role, "token rotation refused");
            return Err(WorkspaceError::Unauthorized {
                workspace_id,
                role: caller_role,
            });
        }

        let rotated = self
            .store
            .replace_token(workspace_id, &mut |current| {
                ApiAccessToken::generate_replacing(current)
            })?;

        match &rotated {
            Some(settings) => {
                tracing::info!(workspace_id, settings_id = settings.id, "API token rotated")
            }
            None => tracing::debug!(workspace_id, "no settings row to rotate"),
        }
        Ok(rotated.map(|s| s.token_view()))
    }

    /// Resolve `principal`'s role through `gate`, then [`regenerate_token`](Self::regenerate_token).
    pub fn regenerate_token_as(
        &self,
        workspace_id: WorkspaceId,
        principal: &str,
        gate: &dyn AuthorizationGate,
    ) -> Result<Option<TokenView>, WorkspaceError> {
        self.regenerate_token(workspace_id, gate.role_of(workspace_id, principal))
    }

    /// Check Basic credentials. Returns the workspace they unlock, or
    /// `None` if the settings id is unknown or the token does not match.
    pub fn authenticate_basic(
        &self,
        encoded: &str,
    ) -> Result<Option<WorkspaceId>, WorkspaceError> {
        let (settings_id, token) = parse_basic_credentials(encoded)?;
        let Some(settings) = self.store.find_by_id(settings_id)? else {
            return Ok(None);
        };
        if settings.api_access_token.matches(&token) {
            Ok(Some(settings.workspace_id))
        } else {
            tracing::debug!(settings_id, "API token mismatch");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StaticRoleGate;
    use crate::store::MemorySettingsStore;

    fn authority() -> TokenAuthority<MemorySettingsStore> {
        TokenAuthority::new(Arc::new(MemorySettingsStore::new()))
    }

    #[test]
    fn view_is_none_without_settings() {
        assert!(authority().get_token_view(1).unwrap().is_none());
    }

    #[test]
    fn admin_rotation_changes_token() {
        let auth = authority();
        let before = auth.provision(1).unwrap();

        let first = auth.regenerate_token(1, Role::Admin).unwrap().unwrap();
        let second = auth.regenerate_token(1, Role::Admin).unwrap().unwrap();

        assert_ne!(first.api_access_token, before.api_access_token);
        assert_ne!(second.api_access_token, first.api_access_token);
        assert_eq!(second.settings_id, before.settings_id);
        assert_eq!(auth.get_token_view(1).unwrap(), Some(second));
    }

    #[test]
    fn non_admin_rotation_is_refused_and_token_kept() {
        let auth = authority();
        let before = auth.provision(1).unwrap();

        for role in [Role::Member, Role::None] {
            let err = auth.regenerate_token(1, role).unwrap_err();
            assert!(matches!(err, WorkspaceError::Unauthorized { workspace_id: 1, .. }));
        }
        assert_eq!(auth.get_token_view(1).unwrap(), Some(before));
    }

    #[test]
    fn unauthorized_is_distinct_from_missing_workspace() {
        let auth = authority();
        assert!(auth.regenerate_token(9, Role::Admin).unwrap().is_none());
        assert!(auth.regenerate_token(9, Role::Member).is_err());
    }

    #[test]
    fn rotation_through_gate() {
        let auth = authority();
        auth.provision(1).unwrap();
        let mut gate = StaticRoleGate::new();
        gate.grant(1, "admin@example.com", Role::Admin);
        gate.grant(1, "member@example.com", Role::Member);

        assert!(auth.regenerate_token_as(1, "admin@example.com", &gate).is_ok());
        assert!(auth.regenerate_token_as(1, "member@example.com", &gate).is_err());
        assert!(auth.regenerate_token_as(1, "stranger@example.com", &gate).is_err());
    }

    #[test]
    fn basic_auth_follows_rotation() {
        let auth = authority();
        let old = auth.provision(1).unwrap();
        assert_eq!(auth.authenticate_basic(&old.basic_credentials()).unwrap(), Some(1));

        let new = auth.regenerate_token(1, Role::Admin).unwrap().unwrap();
        assert_eq!(auth.authenticate_basic(&old.basic_credentials()).unwrap(), None);
        assert_eq!(auth.authenticate_basic(&new.basic_credentials()).unwrap(), Some(1));
    }

    #[test]
    fn basic_auth_with_unknown_settings_id() {
        let auth = authority();
        let view = TokenView {
            settings_id: 77,
            workspace_id: 1,
            api_access_token: ApiAccessToken::generate(),
        };
        assert_eq!(auth.authenticate_basic(&view.basic_credentials()).unwrap(), None);
    }
}
