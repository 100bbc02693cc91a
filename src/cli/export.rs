use anyhow::{Context, Result};
use serde_json::Value;

use refsync::config::RefsyncConfig;
use refsync::store::DocumentStore;

/// Print one document (with `id`) or a whole collection as JSON to stdout.
pub fn export(config: &RefsyncConfig, collection: &str, id: Option<&str>) -> Result<()> {
    let kind = super::parse_collection(collection)?;
    let store = super::open_store(config)?;

    let docs = match id {
        Some(id) => {
            let doc = store
                .find_by_id(kind.collection(), id)?
                .with_context(|| format!("{kind} {id} not found"))?;
            vec![doc]
        }
        None => store.list(kind.collection())?,
    };

    let count = docs.len();
    let data: Value = match id {
        Some(_) => docs.into_iter().next().map(Value::Object).unwrap_or(Value::Null),
        None => Value::Array(docs.into_iter().map(Value::Object).collect()),
    };

    println!("{}", serde_json::to_string_pretty(&data)?);
    eprintln!("Exported {count} {kind} document(s).");
    Ok(())
}
