//! Configuration for the Sidekick client.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::common::errors::{SidekickError, SidekickResult};

/// Environment variable selecting the storage backend.
pub const STORAGE_ENV: &str = "SIDEKICK_STORAGE";
/// Environment variable overriding the state file or database path.
pub const STATE_PATH_ENV: &str = "SIDEKICK_STATE_PATH";
/// Environment variable overriding the durable record key.
pub const RECORD_KEY_ENV: &str = "SIDEKICK_RECORD_KEY";
/// Environment variable overriding the backend base URL.
pub const BACKEND_URL_ENV: &str = "SIDEKICK_BACKEND_URL";
/// Environment variable overriding the backend request timeout (seconds).
pub const TIMEOUT_ENV: &str = "SIDEKICK_TIMEOUT_SECS";
/// Environment variable overriding the auto-title length.
pub const TITLE_MAX_CHARS_ENV: &str = "SIDEKICK_TITLE_MAX_CHARS";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SidekickConfig {
    /// Durable storage settings.
    pub storage: StorageConfig,
    /// Backend query service settings.
    pub backend: BackendConfig,
    /// Conversation naming settings.
    pub naming: NamingConfig,
}

impl SidekickConfig {
    /// Build a configuration from defaults overridden by `SIDEKICK_*` variables.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_env() -> SidekickResult<Self> {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var(STORAGE_ENV) {
            config.storage.kind = kind.parse()?;
        }
        if let Ok(path) = std::env::var(STATE_PATH_ENV) {
            config.storage.path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var(RECORD_KEY_ENV) {
            config.storage.record_key = key;
        }
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.backend.base_url = url;
        }
        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            config.backend.request_timeout_secs = parse_number(TIMEOUT_ENV, &secs)?;
        }
        if let Ok(chars) = std::env::var(TITLE_MAX_CHARS_ENV) {
            config.naming.title_max_chars = parse_number(TITLE_MAX_CHARS_ENV, &chars)?;
        }

        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> SidekickResult<()> {
        if self.storage.record_key.trim().is_empty() {
            return Err(SidekickError::InvalidConfig(
                "storage.record_key must not be empty".to_string(),
            ));
        }

        if self.naming.default_prefix.trim().is_empty() {
            return Err(SidekickError::InvalidConfig(
                "naming.default_prefix must not be empty".to_string(),
            ));
        }

        if self.naming.title_max_chars == 0 {
            return Err(SidekickError::InvalidConfig(
                "naming.title_max_chars must be > 0".to_string(),
            ));
        }

        if self.backend.connect_timeout_secs == 0 || self.backend.request_timeout_secs == 0 {
            return Err(SidekickError::InvalidConfig(
                "backend timeouts must be > 0".to_string(),
            ));
        }

        Url::parse(&self.backend.base_url)?;

        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> SidekickResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SidekickError::InvalidConfig(format!("{name} must be a number, got {raw:?}")))
}

/// Storage backend selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// JSON file on disk.
    File,
    /// Named record in a `SQLite` database.
    Sqlite,
    /// Process memory only, nothing survives a restart.
    Memory,
}

impl FromStr for StorageKind {
    type Err = SidekickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(SidekickError::InvalidConfig(format!(
                "unknown storage backend: {other}"
            ))),
        }
    }
}

/// Storage configuration for session state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend holds the record.
    pub kind: StorageKind,
    /// State file or database path.
    pub path: PathBuf,
    /// Row key of the durable record in the `SQLite` table.
    ///
    /// Only the `sqlite` backend reads it. A state file holds exactly one
    /// record, so the `file` backend is addressed by `path` alone.
    pub record_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::File,
            path: PathBuf::from("sidekick_conversations.json"),
            record_key: "sidekick_conversations".to_string(),
        }
    }
}

/// Backend query service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the query service.
    pub base_url: String,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
        }
    }
}

/// Conversation naming settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Word preceding the date in default names.
    pub default_prefix: String,
    /// Maximum characters kept when titling from a prompt.
    pub title_max_chars: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            default_prefix: "Interview".to_string(),
            title_max_chars: 30,
        }
    }
}
