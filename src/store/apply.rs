//! Semantics of the update primitives against a JSON document.
//!
//! Both shipped stores load a document, run it through [`apply_op`], and write
//! it back if it changed. Keeping the semantics here means the SQLite store and
//! the in-memory fake cannot drift apart.

use serde_json::Value;

use super::{Filter, StorageError, StorageResult, Update, WriteOp};
use crate::document::{document_id, value_id, Document};

/// Top-level field stamped with the actor of a summary update.
pub const UPDATED_BY_FIELD: &str = "updatedBy";

/// Whether `filter` selects `doc`.
pub fn filter_matches(doc: &Document, filter: &Filter) -> bool {
    if document_id(doc).as_deref() != Some(filter.target_id()) {
        return false;
    }
    match filter {
        Filter::Id { .. } => true,
        Filter::IdWithEmbedded {
            array_field,
            embedded_id,
            ..
        } => doc
            .get(array_field)
            .and_then(Value::as_array)
            .is_some_and(|entries| {
                entries
                    .iter()
                    .any(|e| value_id(e).as_deref() == Some(embedded_id.as_str()))
            }),
    }
}

/// Apply one op to an optional document. Returns `(matched, modified)`.
pub fn apply_op(doc: Option<&mut Document>, op: &WriteOp) -> StorageResult<(bool, bool)> {
    let Some(doc) = doc else {
        return Ok((false, false));
    };
    if !filter_matches(doc, &op.filter) {
        return Ok((false, false));
    }
    let modified = apply_update(doc, &op.update)?;
    Ok((true, modified))
}

/// Apply an update to a document already selected by its filter.
/// Returns `true` if the document changed.
pub fn apply_update(doc: &mut Document, update: &Update) -> StorageResult<bool> {
    match update {
        Update::ReplaceEmbedded {
            array_field,
            entry,
            updated_by,
        } => {
            let changed = replace_embedded(doc, array_field, entry)?;
            Ok(stamp(doc, updated_by.as_ref()) | changed)
        }
        Update::AddToSetById {
            array_field,
            entries,
            updated_by,
        } => {
            let changed = add_to_set(doc, array_field, entries)?;
            Ok(stamp(doc, updated_by.as_ref()) | changed)
        }
        Update::PullById {
            array_field,
            ids,
            updated_by,
        } => {
            let changed = pull(doc, array_field, ids)?;
            Ok(stamp(doc, updated_by.as_ref()) | changed)
        }
        Update::Increment { field, delta } => increment(doc, field, *delta),
    }
}

fn stamp(doc: &mut Document, updated_by: Option<&Value>) -> bool {
    match updated_by {
        Some(actor) if doc.get(UPDATED_BY_FIELD) != Some(actor) => {
            doc.insert(UPDATED_BY_FIELD.to_string(), actor.clone());
            true
        }
        _ => false,
    }
}

/// Borrow `field` as an array, creating it when `create` is set and it is absent.
fn array_mut<'a>(
    doc: &'a mut Document,
    field: &str,
    create: bool,
) -> StorageResult<Option<&'a mut Vec<Value>>> {
    let missing = matches!(doc.get(field), None | Some(Value::Null));
    if missing {
        if !create {
            return Ok(None);
        }
        doc.insert(field.to_string(), Value::Array(Vec::new()));
    }
    match doc.get_mut(field) {
        Some(Value::Array(entries)) => Ok(Some(entries)),
        _ => Err(StorageError::InvalidData(format!(
            "field `{field}` is not an array"
        ))),
    }
}

fn entry_id(entry: &Document) -> StorageResult<String> {
    document_id(entry)
        .ok_or_else(|| StorageError::InvalidData("embedded entry has no `_id`".into()))
}

fn replace_embedded(doc: &mut Document, field: &str, entry: &Document) -> StorageResult<bool> {
    let id = entry_id(entry)?;
    let Some(entries) = array_mut(doc, field, false)? else {
        return Ok(false);
    };

    let mut changed = false;
    for existing in entries
        .iter_mut()
        .filter(|e| value_id(e).as_deref() == Some(id.as_str()))
    {
        match existing {
            Value::Object(current) => {
                for (key, value) in entry {
                    if current.get(key) != Some(value) {
                        current.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
            }
            // A bare id reference gets upgraded to the full summary.
            other => {
                *other = Value::Object(entry.clone());
                changed = true;
            }
        }
    }
    Ok(changed)
}

fn add_to_set(doc: &mut Document, field: &str, entries: &[Document]) -> StorageResult<bool> {
    let ids = entries.iter().map(entry_id).collect::<StorageResult<Vec<_>>>()?;
    let Some(existing) = array_mut(doc, field, true)? else {
        return Ok(false);
    };

    let mut changed = false;
    for (id, entry) in ids.iter().zip(entries) {
        let present = existing
            .iter()
            .any(|e| value_id(e).as_deref() == Some(id.as_str()));
        if !present {
            existing.push(Value::Object(entry.clone()));
            changed = true;
        }
    }
    Ok(changed)
}

fn pull(doc: &mut Document, field: &str, ids: &[String]) -> StorageResult<bool> {
    let Some(entries) = array_mut(doc, field, false)? else {
        return Ok(false);
    };
    let before = entries.len();
    entries.retain(|e| match value_id(e) {
        Some(id) => !ids.contains(&id),
        None => true,
    });
    Ok(entries.len() != before)
}

fn increment(doc: &mut Document, field: &str, delta: i64) -> StorageResult<bool> {
    let current = match doc.get(field) {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_i64().ok_or_else(|| {
            StorageError::InvalidData(format!("field `{field}` is not an integer"))
        })?,
    };
    if delta == 0 && doc.contains_key(field) {
        return Ok(false);
    }
    let next = current.checked_add(delta).ok_or_else(|| {
        StorageError::InvalidData(format!("counter `{field}` overflowed"))
    })?;
    doc.insert(field.to_string(), Value::from(next));
    Ok(true)
}
