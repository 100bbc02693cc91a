#![allow(dead_code)]

use refsync::document::{value_id, Document};
use refsync::store::sqlite::SqliteStore;
use refsync::store::DocumentStore;
use serde_json::{json, Value};

/// A fresh in-memory SQLite store with schema and migrations applied.
pub fn sqlite_store() -> SqliteStore {
    SqliteStore::in_memory().unwrap()
}

/// Convert a JSON object literal into a document.
pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("document must be a JSON object")
}

/// Insert one document per id, each a copy of `base` with `_id` set.
pub fn seed(store: &impl DocumentStore, collection: &str, ids: &[&str], base: Value) {
    for id in ids {
        let mut d = doc(base.clone());
        d.insert("_id".into(), json!(id));
        store.put(collection, d).unwrap();
    }
}

/// Fetch a document that must exist.
pub fn fetch(store: &impl DocumentStore, collection: &str, id: &str) -> Document {
    store
        .find_by_id(collection, id)
        .unwrap()
        .unwrap_or_else(|| panic!("{collection}/{id} should exist"))
}

/// Ids of the entries in an embedded array, in stored order.
pub fn embedded_ids(store: &impl DocumentStore, collection: &str, id: &str, field: &str) -> Vec<String> {
    fetch(store, collection, id)
        .get(field)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(value_id).collect())
        .unwrap_or_default()
}

/// Integer counter on a document (missing counts as zero).
pub fn counter(store: &impl DocumentStore, collection: &str, id: &str, field: &str) -> i64 {
    fetch(store, collection, id)
        .get(field)
        .and_then(Value::as_i64)
        .unwrap_or(0)
}
