//! # tr-typo
//!
//! Typo lifecycle and reporting for Typo Reporter.
//!
//! Contributors report typos found on a tracked site; every typo belongs to
//! a workspace and moves through a small, fixed lifecycle driven by
//! caller-supplied events.
//!
//! ## Key components
//!
//! - [`next_status`] — the pure lifecycle engine over [`TypoStatus`] and
//!   [`TypoEvent`], backed by the explicit [`TRANSITIONS`] table
//! - [`TypoStore`] — repository trait for typo records, with the
//!   in-process [`MemoryTypoStore`]
//! - [`TypoService`] — report creation, status updates, deletion, paged
//!   listing, per-status counts and "last typo" lookup, all workspace-scoped
//! - [`TypoActivity`] / [`EventDispatcher`] — activity notifications to
//!   [`ActivitySink`]s such as the JSONL [`LogSink`]

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod page;
pub mod service;
pub mod store;
pub mod typo;

pub use error::TypoError;
pub use events::{ActivitySink, EventDispatcher, LogSink, TypoActivity};
pub use lifecycle::{next_status, Transition, TypoEvent, TypoStatus, UnknownName, TRANSITIONS};
pub use page::{Page, PageRequest, SortDirection, SortKey};
pub use service::{ServiceConfig, TypoService};
pub use store::{MemoryTypoStore, TypoStore};
pub use typo::{NewTypo, Typo, TypoId, TypoReport, TypoResult, WorkspaceId};
