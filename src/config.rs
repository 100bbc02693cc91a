use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::sync::ActorContext;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RefsyncConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Actor stamped on summary writes when none is given on the command line.
    pub default_actor: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_refsync_dir()
            .join("records.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl SyncConfig {
    /// Resolve the actor for a pass: explicit wins, then the configured default.
    pub fn actor(&self, explicit: Option<&str>) -> ActorContext {
        match explicit.or(self.default_actor.as_deref()) {
            Some(name) => ActorContext::new(name),
            None => ActorContext::anonymous(),
        }
    }
}

/// Returns `~/.refsync/`
pub fn default_refsync_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".refsync")
}

/// Returns the default config file path: `~/.refsync/config.toml`
pub fn default_config_path() -> PathBuf {
    default_refsync_dir().join("config.toml")
}

impl RefsyncConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RefsyncConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (REFSYNC_DB, REFSYNC_LOG_LEVEL, REFSYNC_ACTOR).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REFSYNC_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("REFSYNC_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("REFSYNC_ACTOR") {
            self.sync.default_actor = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

/// Expand a leading `~/`. Without a home directory the path is used verbatim.
pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
