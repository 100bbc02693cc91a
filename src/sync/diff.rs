//! Owner-side planning: turn a prior/next pair of owner documents into the
//! add and remove inputs of a sync pass.
//!
//! Summary relations re-send the whole next owner on the add side, so edits to
//! summary fields reach documents that were already linked; only refs that
//! disappeared go on the remove side. Counter relations diff as multisets, so
//! refs present in both versions are not counted again.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use super::error::SyncError;
use super::normalize::json_kind;
use super::types::{Relation, SyncMode};
use crate::document::{document_id, value_id, Document};

/// Inputs for one [`SyncEngine::synchronize`](super::engine::SyncEngine::synchronize) call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannedSync {
    pub add: Option<Value>,
    pub remove: Option<Value>,
}

impl PlannedSync {
    pub fn is_noop(&self) -> bool {
        self.add.is_none() && self.remove.is_none()
    }
}

/// A newly created owner: everything it references is attached.
pub fn plan_create(next: &Value) -> PlannedSync {
    PlannedSync {
        add: Some(next.clone()),
        remove: None,
    }
}

/// A deleted owner: everything it referenced is detached.
pub fn plan_delete(prior: &Value) -> PlannedSync {
    PlannedSync {
        add: None,
        remove: Some(prior.clone()),
    }
}

/// An edited owner.
pub fn plan_update(relation: &Relation, prior: &Value, next: &Value) -> Result<PlannedSync, SyncError> {
    let prior_doc = as_owner(prior, "prior")?;
    let next_doc = as_owner(next, "next")?;

    let owner_id = document_id(next_doc)
        .ok_or_else(|| SyncError::MalformedInput("next owner has no usable `_id`".into()))?;
    if document_id(prior_doc).as_deref() != Some(owner_id.as_str()) {
        return Err(SyncError::MalformedInput(format!(
            "prior and next owner ids differ (next is {owner_id})"
        )));
    }

    let prior_ids = ref_ids(relation, prior_doc, &owner_id)?;
    let next_ids = ref_ids(relation, next_doc, &owner_id)?;

    let planned = match relation.mode {
        SyncMode::Summary { .. } => {
            let keep: HashSet<&String> = next_ids.iter().collect();
            let mut seen = HashSet::new();
            let removed: Vec<String> = prior_ids
                .iter()
                .filter(|id| !keep.contains(id) && seen.insert(*id))
                .cloned()
                .collect();
            PlannedSync {
                add: Some(next.clone()),
                remove: owner_with_refs(relation, &owner_id, removed),
            }
        }
        SyncMode::Counter { .. } => PlannedSync {
            add: owner_with_refs(relation, &owner_id, surplus(&next_ids, &prior_ids)),
            remove: owner_with_refs(relation, &owner_id, surplus(&prior_ids, &next_ids)),
        },
    };
    Ok(planned)
}

fn as_owner<'a>(value: &'a Value, which: &str) -> Result<&'a Document, SyncError> {
    value.as_object().ok_or_else(|| {
        SyncError::MalformedInput(format!("{which} owner must be an object, got {}", json_kind(value)))
    })
}

fn ref_ids(relation: &Relation, owner: &Document, owner_id: &str) -> Result<Vec<String>, SyncError> {
    let refs = match owner.get(relation.owner_refs_field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(refs)) => refs,
        Some(other) => {
            return Err(SyncError::MalformedInput(format!(
                "owner {owner_id}: `{}` must be an array, got {}",
                relation.owner_refs_field,
                json_kind(other)
            )))
        }
    };
    refs.iter()
        .enumerate()
        .map(|(i, r)| {
            value_id(r).ok_or_else(|| {
                SyncError::InvalidReference(format!(
                    "ref #{i} of owner {owner_id} has no resolvable id: {r}"
                ))
            })
        })
        .collect()
}

/// Occurrences in `more` beyond those in `less`, in `more`'s order.
fn surplus(more: &[String], less: &[String]) -> Vec<String> {
    let mut budget: HashMap<&str, usize> = HashMap::new();
    for id in less {
        *budget.entry(id.as_str()).or_default() += 1;
    }
    more.iter()
        .filter(|id| match budget.get_mut(id.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

fn owner_with_refs(relation: &Relation, owner_id: &str, refs: Vec<String>) -> Option<Value> {
    if refs.is_empty() {
        return None;
    }
    let mut owner = json!({ "_id": owner_id });
    owner[relation.owner_refs_field] = json!(refs);
    Some(owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::relations::{LOCATION_PATIENTS, SESSION_METRICS};

    #[test]
    fn summary_update_resends_next_and_removes_dropped() {
        let prior = json!({"_id": "L1", "name": "A", "patients": ["P1", "P2", "P3"]});
        let next = json!({"_id": "L1", "name": "A2", "patients": ["P2", {"_id": "P4"}]});

        let plan = plan_update(&LOCATION_PATIENTS, &prior, &next).unwrap();
        assert_eq!(plan.add, Some(next));
        assert_eq!(plan.remove, Some(json!({"_id": "L1", "patients": ["P1", "P3"]})));
    }

    #[test]
    fn summary_update_with_same_refs_removes_nothing() {
        let prior = json!({"_id": "L1", "patients": ["P1"]});
        let next = json!({"_id": "L1", "name": "renamed", "patients": ["P1"]});
        let plan = plan_update(&LOCATION_PATIENTS, &prior, &next).unwrap();
        assert!(plan.add.is_some());
        assert!(plan.remove.is_none());
    }

    #[test]
    fn counter_update_diffs_as_multiset() {
        let prior = json!({"_id": "S1", "metrics": ["M1", "M1", "M2"]});
        let next = json!({"_id": "S1", "metrics": ["M1", "M3", "M3"]});

        let plan = plan_update(&SESSION_METRICS, &prior, &next).unwrap();
        assert_eq!(plan.add, Some(json!({"_id": "S1", "metrics": ["M3", "M3"]})));
        assert_eq!(plan.remove, Some(json!({"_id": "S1", "metrics": ["M1", "M2"]})));
    }

    #[test]
    fn counter_update_with_same_refs_is_noop() {
        let owner = json!({"_id": "S1", "notes": "edited", "metrics": ["M1", "M2"]});
        let plan = plan_update(&SESSION_METRICS, &owner, &owner).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn owner_id_must_not_change() {
        let err = plan_update(
            &LOCATION_PATIENTS,
            &json!({"_id": "L1"}),
            &json!({"_id": "L2"}),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::MalformedInput(_)));
    }

    #[test]
    fn bad_refs_are_invalid_references() {
        let err = plan_update(
            &LOCATION_PATIENTS,
            &json!({"_id": "L1", "patients": [""]}),
            &json!({"_id": "L1", "patients": []}),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidReference(_)));
    }

    #[test]
    fn create_and_delete_pass_owner_through() {
        let owner = json!({"_id": "L1", "patients": ["P1"]});
        assert_eq!(plan_create(&owner).add, Some(owner.clone()));
        assert_eq!(plan_delete(&owner).remove, Some(owner));
    }
}
