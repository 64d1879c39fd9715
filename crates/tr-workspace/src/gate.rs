// gate.rs — Authorization gate: who may do what in a workspace.
//
// The core never looks at session state. It asks an AuthorizationGate for
// the caller's role in the addressed workspace and acts on the answer.
// Unknown principals get Role::None (default deny).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::settings::WorkspaceId;

/// A principal's role within one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
    /// Not a member of the workspace.
    #[default]
    None,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Member => write!(f, "MEMBER"),
            Role::None => write!(f, "NONE"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MEMBER" => Ok(Role::Member),
            "NONE" => Ok(Role::None),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Supplies the caller's role for a workspace.
pub trait AuthorizationGate: Send + Sync {
    fn role_of(&self, workspace_id: WorkspaceId, principal: &str) -> Role;
}

/// One `(workspace, principal, role)` grant, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberGrant {
    pub workspace_id: WorkspaceId,
    pub principal: String,
    pub role: Role,
}

/// Gate backed by a fixed grant table.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleGate {
    roles: HashMap<(WorkspaceId, String), Role>,
}

impl StaticRoleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites any previous grant for the same workspace and principal.
    pub fn grant(&mut self, workspace_id: WorkspaceId, principal: impl Into<String>, role: Role) {
        self.roles.insert((workspace_id, principal.into()), role);
    }

    pub fn from_grants<'a>(grants: impl IntoIterator<Item = &'a MemberGrant>) -> Self {
        let mut gate = Self::new();
        for g in grants {
            gate.grant(g.workspace_id, g.principal.clone(), g.role);
        }
        gate
    }
}

impl AuthorizationGate for StaticRoleGate {
    fn role_of(&self, workspace_id: WorkspaceId, principal: &str) -> Role {
        self.roles
            .get(&(workspace_id, principal.to_string()))
            .copied()
            .unwrap_or_default()
    }
}
