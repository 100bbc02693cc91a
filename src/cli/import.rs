use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use refsync::config::RefsyncConfig;
use refsync::document::document_id;
use refsync::store::DocumentStore;

/// Import documents into a collection from a JSON file.
///
/// The file holds one document or an array of them; each needs an `_id`.
/// Existing documents with the same `_id` are replaced. No sync pass runs:
/// imported data is taken as already consistent.
pub fn import(config: &RefsyncConfig, collection: &str, file: &Path) -> Result<()> {
    let kind = super::parse_collection(collection)?;
    let data = super::read_json(file)?;

    let docs = match data {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => bail!("import file must hold an object or an array of objects"),
    };

    let store = super::open_store(config)?;

    println!("Importing {} {}...", docs.len(), kind);

    let mut imported = 0u64;
    for (i, doc) in docs.into_iter().enumerate() {
        let Value::Object(doc) = doc else {
            bail!("element {i} is not an object");
        };
        let id = document_id(&doc).with_context(|| format!("element {i} has no usable `_id`"))?;
        store
            .put(kind.collection(), doc)
            .with_context(|| format!("failed to store {kind} {id}"))?;
        imported += 1;
    }

    println!("Import complete: {imported} document(s).");
    Ok(())
}
