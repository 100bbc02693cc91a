//! JSON document helpers shared by the stores and the sync engine.
//!
//! Documents are plain JSON objects keyed by an `_id` field. References to
//! other documents appear either as bare ids or as embedded summary objects
//! that carry their own `_id`.

use serde_json::Value;

/// A stored document: a JSON object with an `_id` field.
pub type Document = serde_json::Map<String, Value>;

/// Primary key field of every document and embedded summary.
pub const ID_FIELD: &str = "_id";

/// Alternate key accepted on lightweight reference objects.
const ALT_ID_FIELD: &str = "id";

/// Extract an identifier from a reference value.
///
/// Accepts non-empty strings, non-zero integers, and objects carrying `_id`
/// (or `id`) in one of those forms. Returns `None` for anything else,
/// including empty strings, `0` and `null`.
pub fn value_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if (n.is_i64() || n.is_u64()) && n.as_u64() != Some(0) => {
            Some(n.to_string())
        }
        Value::Object(map) => map
            .get(ID_FIELD)
            .or_else(|| map.get(ALT_ID_FIELD))
            .and_then(|inner| match inner {
                Value::Object(_) => None,
                other => value_id(other),
            }),
        _ => None,
    }
}

/// The `_id` of a document, if it has a usable one.
pub fn document_id(doc: &Document) -> Option<String> {
    doc.get(ID_FIELD).and_then(value_id)
}
