// config.rs — `.tr/config.toml` loading and service wiring.
//
// Every field has a default, so a project without a config file still gets
// a working database under `.tr/`. Relative paths resolve against the
// project root.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tr_store_sqlite::{SqliteDatabase, SqliteSettingsStore, SqliteTypoStore};
use tr_typo::{EventDispatcher, LogSink, ServiceConfig, TypoService};
use tr_workspace::{MemberGrant, StaticRoleGate, TokenAuthority};

/// Directory under the project root holding config, database and logs.
pub const CONFIG_DIR: &str = ".tr";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// JSONL activity log. Set to an empty string to disable.
    #[serde(default = "default_activity_log")]
    pub activity_log: PathBuf,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub service: ServiceConfig,

    /// Role grants consulted for token rotation.
    #[serde(default)]
    pub members: Vec<MemberGrant>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            activity_log: default_activity_log(),
            busy_timeout_ms: default_busy_timeout_ms(),
            service: ServiceConfig::default(),
            members: Vec::new(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("typos.sqlite3")
}

fn default_activity_log() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("activity.jsonl")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl ReporterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load the config, falling back to defaults when the file is missing.
    /// A file that exists but does not parse is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load `<root>/.tr/config.toml` and resolve its paths against `root`.
    pub fn for_project(root: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load_or_default(&root.join(CONFIG_DIR).join("config.toml"))?;
        config.database = resolve(root, &config.database);
        if !config.activity_log.as_os_str().is_empty() {
            config.activity_log = resolve(root, &config.activity_log);
        }
        Ok(config)
    }

    pub fn open_database(&self) -> anyhow::Result<SqliteDatabase> {
        SqliteDatabase::open(&self.database, Duration::from_millis(self.busy_timeout_ms))
            .with_context(|| format!("opening database {}", self.database.display()))
    }

    pub fn typo_service(&self, db: &SqliteDatabase) -> TypoService<SqliteTypoStore> {
        let mut dispatcher = EventDispatcher::new();
        if !self.activity_log.as_os_str().is_empty() {
            dispatcher.add_sink(Box::new(LogSink::new(&self.activity_log)));
        }
        TypoService::with_config(Arc::new(db.typo_store()), self.service.clone())
            .with_dispatcher(dispatcher)
    }

    pub fn token_authority(&self, db: &SqliteDatabase) -> TokenAuthority<SqliteSettingsStore> {
        TokenAuthority::new(Arc::new(db.settings_store()))
    }

    pub fn role_gate(&self) -> StaticRoleGate {
        StaticRoleGate::from_grants(&self.members)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tr_typo::SortDirection;
    use tr_workspace::Role;

    #[test]
    fn missing_file_gives_defaults_under_project_root() {
        let project = TempDir::new().unwrap();
        let config = ReporterConfig::for_project(project.path()).unwrap();
        assert_eq!(config.database, project.path().join(".tr/typos.sqlite3"));
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.service.max_text_len, 1000);
        assert!(config.members.is_empty());
    }

    #[test]
    fn parses_service_and_members() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            project.path().join(".tr/config.toml"),
            r#"
database = "/var/lib/tr/typos.sqlite3"
activity_log = ""

[service]
last_typo_order = "desc"
default_page_size = 50

[[members]]
workspace_id = 101
principal = "alice"
role = "ADMIN"
"#,
        )
        .unwrap();

        let config = ReporterConfig::for_project(project.path()).unwrap();
        assert_eq!(config.database, PathBuf::from("/var/lib/tr/typos.sqlite3"));
        assert!(config.activity_log.as_os_str().is_empty());
        assert_eq!(config.service.last_typo_order, SortDirection::Desc);
        assert_eq!(config.service.default_page_size, 50);
        assert_eq!(config.service.max_text_len, 1000);
        assert_eq!(config.members[0].role, Role::Admin);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(project.path().join(".tr/config.toml"), "busy_timeout_ms = \"soon\"")
            .unwrap();
        assert!(ReporterConfig::for_project(project.path()).is_err());
    }
}
