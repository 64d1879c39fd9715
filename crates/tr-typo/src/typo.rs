// typo.rs — Typo records, inbound reports, and the outbound result view.
//
// `TypoReport` is what a contributor submits. The service validates it and
// turns it into a `NewTypo` (status fixed to REPORTED), the store assigns
// an id and hands back a `Typo`. Callers only ever see `TypoResult`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypoError;
use crate::lifecycle::TypoStatus;

/// Workspace (tenant) identifier.
pub type WorkspaceId = i64;

/// Store-assigned typo identifier.
pub type TypoId = i64;

/// A typo report as submitted by a contributor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypoReport {
    /// Page on the tracked site where the typo was found.
    pub page_url: String,
    /// The misspelled text.
    pub report_text: String,
    /// Proposed correction, if the reporter gave one.
    #[serde(default)]
    pub suggested_fix: String,
    /// Text immediately before the typo.
    #[serde(default)]
    pub text_before: String,
    /// Text immediately after the typo.
    #[serde(default)]
    pub text_after: String,
    #[serde(default)]
    pub reporter_name: String,
    #[serde(default)]
    pub reporter_comment: String,
}

impl TypoReport {
    pub fn new(page_url: impl Into<String>, report_text: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            report_text: report_text.into(),
            ..Self::default()
        }
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = fix.into();
        self
    }

    pub fn with_context(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.text_before = before.into();
        self.text_after = after.into();
        self
    }

    pub fn with_reporter(mut self, name: impl Into<String>, comment: impl Into<String>) -> Self {
        self.reporter_name = name.into();
        self.reporter_comment = comment.into();
        self
    }

    /// Check required fields and length limits.
    pub fn validate(&self, max_text_len: usize) -> Result<(), TypoError> {
        if self.page_url.trim().is_empty() {
            return Err(TypoError::validation("page_url", "must not be blank"));
        }
        if !is_http_url(self.page_url.trim()) {
            return Err(TypoError::validation(
                "page_url",
                format!("must be an http(s) URL with a host, got '{}'", self.page_url),
            ));
        }
        if self.report_text.trim().is_empty() {
            return Err(TypoError::validation("report_text", "must not be blank"));
        }

        let fields: [(&'static str, &str); 7] = [
            ("page_url", &self.page_url),
            ("report_text", &self.report_text),
            ("suggested_fix", &self.suggested_fix),
            ("text_before", &self.text_before),
            ("text_after", &self.text_after),
            ("reporter_name", &self.reporter_name),
            ("reporter_comment", &self.reporter_comment),
        ];
        for (field, value) in fields {
            let len = value.chars().count();
            if len > max_text_len {
                return Err(TypoError::validation(
                    field,
                    format!("is {len} characters long, limit is {max_text_len}"),
                ));
            }
        }
        Ok(())
    }
}

/// `http` or `https` scheme (any case) followed by a non-empty host.
fn is_http_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    if !(scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")) {
        return false;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default();
    !host.is_empty() && !host.contains(char::is_whitespace)
}

/// A typo ready to be inserted. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTypo {
    pub workspace_id: WorkspaceId,
    pub status: TypoStatus,
    pub report: TypoReport,
    pub created_at: DateTime<Utc>,
}

impl NewTypo {
    /// A freshly reported typo. Reports always enter the lifecycle as REPORTED.
    pub fn reported(workspace_id: WorkspaceId, report: TypoReport) -> Self {
        Self {
            workspace_id,
            status: TypoStatus::Reported,
            report,
            created_at: Utc::now(),
        }
    }
}

/// A persisted typo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Typo {
    pub id: TypoId,
    pub workspace_id: WorkspaceId,
    pub status: TypoStatus,
    #[serde(flatten)]
    pub report: TypoReport,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Typo {
    pub(crate) fn from_new(id: TypoId, new: NewTypo) -> Self {
        Self {
            id,
            workspace_id: new.workspace_id,
            status: new.status,
            report: new.report,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }
}

/// The view of a typo handed back to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypoResult {
    pub id: TypoId,
    pub workspace_id: WorkspaceId,
    pub status: TypoStatus,
    pub page_url: String,
    pub report_text: String,
    pub suggested_fix: String,
    pub text_before: String,
    pub text_after: String,
    pub reporter_name: String,
    pub reporter_comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Typo> for TypoResult {
    fn from(typo: Typo) -> Self {
        let TypoReport {
            page_url,
            report_text,
            suggested_fix,
            text_before,
            text_after,
            reporter_name,
            reporter_comment,
        } = typo.report;
        Self {
            id: typo.id,
            workspace_id: typo.workspace_id,
            status: typo.status,
            page_url,
            report_text,
            suggested_fix,
            text_before,
            text_after,
            reporter_name,
            reporter_comment,
            created_at: typo.created_at,
            updated_at: typo.updated_at,
        }
    }
}
