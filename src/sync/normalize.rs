//! Turns raw add/remove inputs into [`OwnerChangeDescriptor`]s.
//!
//! An input is `null`, a single owner-shaped object, or an array of them. The
//! owner's refs live in the relation's `owner_refs_field`; the refs themselves
//! are kept raw here and resolved by the pivot step.

use serde_json::Value;

use super::error::SyncError;
use super::types::{OwnerChangeDescriptor, Relation, Side, SyncMode};
use crate::document::{document_id, Document, ID_FIELD};

/// Normalize one side's input. `None` and JSON `null` mean "nothing to do".
pub fn normalize(
    relation: &Relation,
    input: Option<&Value>,
    side: Side,
) -> Result<Vec<OwnerChangeDescriptor>, SyncError> {
    let owners: Vec<&Value> = match input {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(single @ Value::Object(_)) => vec![single],
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => {
            return Err(SyncError::MalformedInput(format!(
                "{side} input must be an object or an array of objects, got {}",
                json_kind(other)
            )))
        }
    };

    owners
        .into_iter()
        .enumerate()
        .map(|(index, owner)| describe(relation, owner, side, index))
        .collect()
}

fn describe(
    relation: &Relation,
    owner: &Value,
    side: Side,
    index: usize,
) -> Result<OwnerChangeDescriptor, SyncError> {
    let Value::Object(owner) = owner else {
        return Err(SyncError::MalformedInput(format!(
            "{side} input element {index} is {}, expected an object",
            json_kind(owner)
        )));
    };

    let owner_id = document_id(owner).ok_or_else(|| {
        SyncError::MalformedInput(format!("{side} owner at index {index} has no usable `_id`"))
    })?;

    let refs = match owner.get(relation.owner_refs_field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(SyncError::MalformedInput(format!(
                "owner {owner_id}: `{}` must be an array, got {}",
                relation.owner_refs_field,
                json_kind(other)
            )))
        }
    };

    let owner_summary = owner_summary(relation, &owner_id, owner);
    let (add_foreign_refs, remove_foreign_refs) = match side {
        Side::Add => (refs, Vec::new()),
        Side::Remove => (Vec::new(), refs),
    };

    Ok(OwnerChangeDescriptor {
        owner_id,
        owner_summary,
        add_foreign_refs,
        remove_foreign_refs,
    })
}

/// Build the summary embedded on the foreign side: `_id` first, then each
/// summary-shape field the owner actually has. A scalar `_id` keeps its JSON
/// type; an object-shaped one is flattened to the resolved id.
pub fn owner_summary(relation: &Relation, owner_id: &str, owner: &Document) -> Document {
    let id = match owner.get(ID_FIELD) {
        Some(raw @ (Value::String(_) | Value::Number(_))) => raw.clone(),
        _ => Value::String(owner_id.to_string()),
    };
    let mut summary = Document::new();
    summary.insert(ID_FIELD.to_string(), id);
    if let SyncMode::Summary { summary_shape, .. } = relation.mode {
        for field in summary_shape {
            if let Some(value) = owner.get(*field) {
                summary.insert((*field).to_string(), value.clone());
            }
        }
    }
    summary
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::relations::{LOCATION_PATIENTS, SESSION_METRICS};
    use serde_json::json;

    #[test]
    fn null_and_missing_inputs_are_empty() {
        assert!(normalize(&LOCATION_PATIENTS, None, Side::Add).unwrap().is_empty());
        assert!(normalize(&LOCATION_PATIENTS, Some(&Value::Null), Side::Remove)
            .unwrap()
            .is_empty());
        assert!(normalize(&LOCATION_PATIENTS, Some(&json!([])), Side::Add)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn single_object_and_one_element_array_are_equivalent() {
        let owner = json!({"_id": "L1", "name": "Clinic A", "patients": ["P1"]});
        let single = normalize(&LOCATION_PATIENTS, Some(&owner), Side::Add).unwrap();
        let batch = normalize(&LOCATION_PATIENTS, Some(&json!([owner])), Side::Add).unwrap();
        assert_eq!(single, batch);
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn add_side_fills_add_refs_and_summary() {
        let owner = json!({
            "_id": "L1", "name": "Clinic A", "address": "1 Main St", "patients": ["P1", {"_id": "P2"}]
        });
        let descriptors = normalize(&LOCATION_PATIENTS, Some(&owner), Side::Add).unwrap();
        let d = &descriptors[0];
        assert_eq!(d.owner_id, "L1");
        assert_eq!(Value::Object(d.owner_summary.clone()), json!({"_id": "L1", "name": "Clinic A"}));
        assert_eq!(d.add_foreign_refs, vec![json!("P1"), json!({"_id": "P2"})]);
        assert!(d.remove_foreign_refs.is_empty());
    }

    #[test]
    fn remove_side_fills_remove_refs() {
        let owner = json!({"_id": "L1", "patients": ["P1"]});
        let d = &normalize(&LOCATION_PATIENTS, Some(&owner), Side::Remove).unwrap()[0];
        assert!(d.add_foreign_refs.is_empty());
        assert_eq!(d.remove_foreign_refs, vec![json!("P1")]);
    }

    #[test]
    fn missing_refs_field_means_no_refs() {
        let d = &normalize(&LOCATION_PATIENTS, Some(&json!({"_id": "L1"})), Side::Add).unwrap()[0];
        assert!(d.add_foreign_refs.is_empty());
    }

    #[test]
    fn numeric_owner_id_keeps_its_type() {
        let owner = json!({"_id": 42, "name": "Clinic A", "patients": ["P1"]});
        let d = &normalize(&LOCATION_PATIENTS, Some(&owner), Side::Add).unwrap()[0];
        assert_eq!(d.owner_id, "42");
        assert_eq!(Value::Object(d.owner_summary.clone()), json!({"_id": 42, "name": "Clinic A"}));

        let nested = json!({"_id": {"_id": "L9"}, "patients": []});
        let d = &normalize(&LOCATION_PATIENTS, Some(&nested), Side::Add).unwrap()[0];
        assert_eq!(d.owner_summary["_id"], json!("L9"));
    }

    #[test]
    fn counter_summary_is_just_the_id() {
        let owner = json!({"_id": "S1", "date": "2024-01-01", "metrics": ["M1"]});
        let d = &normalize(&SESSION_METRICS, Some(&owner), Side::Add).unwrap()[0];
        assert_eq!(Value::Object(d.owner_summary.clone()), json!({"_id": "S1"}));
    }

    #[test]
    fn scalar_input_is_malformed() {
        for bad in [json!("L1"), json!(7), json!(true)] {
            let err = normalize(&LOCATION_PATIENTS, Some(&bad), Side::Add).unwrap_err();
            assert!(matches!(err, SyncError::MalformedInput(_)), "{bad}");
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn non_object_array_element_is_malformed() {
        let input = json!([{"_id": "L1"}, "L2"]);
        let err = normalize(&LOCATION_PATIENTS, Some(&input), Side::Remove).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn owner_without_id_is_malformed() {
        let err = normalize(&LOCATION_PATIENTS, Some(&json!({"patients": ["P1"]})), Side::Add)
            .unwrap_err();
        assert!(matches!(err, SyncError::MalformedInput(_)));
    }

    #[test]
    fn non_array_refs_field_is_malformed() {
        let err = normalize(
            &LOCATION_PATIENTS,
            Some(&json!({"_id": "L1", "patients": "P1"})),
            Side::Add,
        )
        .unwrap_err();
        assert!(err.to_string().contains("`patients` must be an array"));
    }
}
