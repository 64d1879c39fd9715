//! # tr-workspace
//!
//! Workspace settings and API access tokens for Typo Reporter.
//!
//! Every workspace has one [`WorkspaceSettings`] row holding an opaque
//! [`ApiAccessToken`]. External integrations authenticate with Basic
//! credentials built from the settings id and that token. Only workspace
//! administrators may rotate it.
//!
//! ## Key components
//!
//! - [`TokenAuthority`] — token view, rotation, provisioning and Basic
//!   credential checks
//! - [`SettingsStore`] — repository trait for settings rows, with the
//!   in-process [`MemorySettingsStore`]
//! - [`AuthorizationGate`] — role lookup consumed by rotation, with the
//!   configuration-backed [`StaticRoleGate`]

pub mod authority;
pub mod error;
pub mod gate;
pub mod settings;
pub mod store;

pub use authority::TokenAuthority;
pub use error::WorkspaceError;
pub use gate::{AuthorizationGate, MemberGrant, Role, StaticRoleGate};
pub use settings::{
    parse_basic_credentials, ApiAccessToken, SettingsId, TokenView, WorkspaceId,
    WorkspaceSettings,
};
pub use store::{MemorySettingsStore, SettingsStore};
