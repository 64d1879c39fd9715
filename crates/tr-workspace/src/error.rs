// error.rs — Error types for workspace settings and token operations.

use thiserror::Error;

use crate::gate::Role;
use crate::settings::WorkspaceId;

/// Errors that can occur during workspace settings operations.
///
/// A missing settings row is not an error; lookups return `None` for it.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The caller's role does not allow the operation.
    #[error("role {role} may not rotate the API token of workspace {workspace_id}")]
    Unauthorized {
        workspace_id: WorkspaceId,
        role: Role,
    },

    /// A Basic credential could not be decoded.
    #[error("malformed API credentials: {0}")]
    InvalidCredentials(String),

    /// The backing store failed.
    #[error("settings store error: {0}")]
    Storage(String),
}
