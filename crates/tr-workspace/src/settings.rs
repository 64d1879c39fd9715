// settings.rs — Workspace settings and the API access token.
//
// Each workspace owns exactly one settings row. The row carries the API
// access token external integrations present, as Basic credentials built
// from "{settings_id}:{token}".
//
// Tokens are 128 bits straight from the OS CSPRNG. They are never derived
// from the workspace id and are only ever replaced, never edited.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkspaceError;

/// Workspace (tenant) identifier.
pub type WorkspaceId = i64;

/// Settings row identifier.
pub type SettingsId = i64;

/// Opaque 128-bit API access token, rendered as a hyphenated UUID string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiAccessToken(Uuid);

impl ApiAccessToken {
    /// A fresh token from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(Uuid::from_bytes(bytes))
    }

    /// A fresh token guaranteed to differ from `previous`.
    pub fn generate_replacing(previous: &ApiAccessToken) -> Self {
        loop {
            let token = Self::generate();
            if token != *previous {
                return token;
            }
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Compare without short-circuiting on the first differing byte.
    pub fn matches(&self, other: &ApiAccessToken) -> bool {
        self.0
            .as_bytes()
            .iter()
            .zip(other.0.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl From<Uuid> for ApiAccessToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for ApiAccessToken {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| WorkspaceError::InvalidCredentials(format!("bad token: {e}")))
    }
}

impl fmt::Display for ApiAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

// Debug output lands in logs; only the tail is shown.
impl fmt::Debug for ApiAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.simple().to_string();
        write!(f, "ApiAccessToken(…{})", &text[text.len() - 4..])
    }
}

/// One workspace's settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub id: SettingsId,
    pub workspace_id: WorkspaceId,
    pub api_access_token: ApiAccessToken,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceSettings {
    pub fn token_view(&self) -> TokenView {
        TokenView {
            settings_id: self.id,
            workspace_id: self.workspace_id,
            api_access_token: self.api_access_token,
        }
    }
}

/// What callers get back: the two raw fields needed to build credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenView {
    pub settings_id: SettingsId,
    pub workspace_id: WorkspaceId,
    pub api_access_token: ApiAccessToken,
}

impl TokenView {
    /// `"{settings_id}:{token}"`, the Basic user:password pair.
    pub fn credential_pair(&self) -> String {
        format!("{}:{}", self.settings_id, self.api_access_token)
    }

    /// Base64 of [`credential_pair`](Self::credential_pair), ready for an
    /// `Authorization: Basic` header.
    pub fn basic_credentials(&self) -> String {
        STANDARD.encode(self.credential_pair())
    }
}

/// Decode Basic credentials (with or without the `Basic ` prefix) into the
/// settings id and token they carry.
pub fn parse_basic_credentials(
    encoded: &str,
) -> Result<(SettingsId, ApiAccessToken), WorkspaceError> {
    let encoded = encoded.trim();
    let encoded = encoded
        .strip_prefix("Basic ")
        .or_else(|| encoded.strip_prefix("basic "))
        .unwrap_or(encoded)
        .trim();

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| WorkspaceError::InvalidCredentials(format!("not base64: {e}")))?;
    let pair = String::from_utf8(bytes)
        .map_err(|_| WorkspaceError::InvalidCredentials("not UTF-8".to_string()))?;
    let (id, token) = pair
        .split_once(':')
        .ok_or_else(|| WorkspaceError::InvalidCredentials("missing ':' separator".to_string()))?;

    let settings_id = id
        .parse::<SettingsId>()
        .map_err(|_| WorkspaceError::InvalidCredentials(format!("bad settings id '{id}'")))?;
    Ok((settings_id, token.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_differ() {
        let a = ApiAccessToken::generate();
        let b = ApiAccessToken::generate_replacing(&a);
        assert_ne!(a, b);
        assert!(!a.matches(&b));
        assert!(a.matches(&a));
    }

    #[test]
    fn token_text_round_trips() {
        let token = ApiAccessToken::generate();
        let parsed: ApiAccessToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn debug_hides_most_of_the_token() {
        let token = ApiAccessToken::generate();
        let debug = format!("{:?}", token);
        assert!(!debug.contains(&token.to_string()));
        assert!(debug.starts_with("ApiAccessToken("));
    }

    #[test]
    fn basic_credentials_round_trip() {
        let view = TokenView {
            settings_id: 12,
            workspace_id: 101,
            api_access_token: ApiAccessToken::generate(),
        };
        let header = format!("Basic {}", view.basic_credentials());
        let (id, token) = parse_basic_credentials(&header).unwrap();
        assert_eq!(id, 12);
        assert_eq!(token, view.api_access_token);
    }

    #[test]
    fn malformed_credentials_are_rejected() {
        assert!(parse_basic_credentials("%%%").is_err());
        let no_colon = STANDARD.encode("12-token");
        assert!(matches!(
            parse_basic_credentials(&no_colon),
            Err(WorkspaceError::InvalidCredentials(_))
        ));
        let bad_id = STANDARD.encode(format!("x:{}", ApiAccessToken::generate()));
        assert!(parse_basic_credentials(&bad_id).is_err());
    }

    #[test]
    fn token_serializes_as_plain_string() {
        let token = ApiAccessToken::generate();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{}\"", token));
    }
}
