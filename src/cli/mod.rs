pub mod export;
pub mod import;
pub mod relations;
pub mod sync;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use refsync::config::RefsyncConfig;
use refsync::store::sqlite::SqliteStore;
use refsync::sync::EntityKind;

/// Open the configured SQLite store.
fn open_store(config: &RefsyncConfig) -> Result<SqliteStore> {
    let db_path = config.resolved_db_path();
    SqliteStore::open(&db_path, config.storage.busy_timeout())
}

/// Read and parse a JSON file.
fn read_json(path: &Path) -> Result<Value> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse JSON in {}", path.display()))
}

/// Validate a collection name against the known entity kinds.
fn parse_collection(name: &str) -> Result<EntityKind> {
    name.parse::<EntityKind>().map_err(anyhow::Error::msg)
}
