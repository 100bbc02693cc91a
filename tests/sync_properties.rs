//! Property-based tests for sync passes.
//!
//! These check the guarantees callers depend on across arbitrary owner sets:
//! - the distinct foreign count is the size of the union of referenced ids
//! - re-running an add pass leaves the foreign side unchanged
//! - an add pass followed by the matching remove pass restores the foreign side,
//!   where an absent embedded array and an empty one count as the same state
//! - counter deltas equal the number of referencing occurrences

mod helpers;

use std::collections::{BTreeSet, HashMap};

use helpers::{counter, seed};
use proptest::prelude::*;
use refsync::document::Document;
use refsync::store::memory::MemoryStore;
use refsync::store::DocumentStore;
use refsync::sync::relations::{LOCATION_PATIENTS, SESSION_METRICS};
use refsync::sync::{ActorContext, SyncEngine};
use serde_json::{json, Value};

const PATIENTS: [&str; 6] = ["P0", "P1", "P2", "P3", "P4", "P5"];
const METRICS: [&str; 4] = ["M0", "M1", "M2", "M3"];

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

/// Ref lists for a handful of owners; each inner vec indexes into a fixed id pool.
fn ref_lists(pool: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0..pool, 0..5), 0..5)
}

/// Locations `L{offset + i}`, one per ref list, each pointing at patients.
fn locations(lists: &[Vec<usize>], offset: usize) -> Value {
    Value::Array(
        lists
            .iter()
            .enumerate()
            .map(|(i, refs)| {
                let patients: Vec<&str> = refs.iter().map(|&r| PATIENTS[r]).collect();
                json!({
                    "_id": format!("L{}", offset + i),
                    "name": format!("Clinic {}", offset + i),
                    "patients": patients,
                })
            })
            .collect(),
    )
}

fn patient_store() -> MemoryStore {
    patient_store_from(json!({"locations": []}))
}

fn patient_store_from(base: Value) -> MemoryStore {
    let store = MemoryStore::new();
    seed(&store, "patients", &PATIENTS, base);
    store
}

/// An absent embedded array and an empty one are the same foreign state.
fn with_locations(mut patients: Vec<Document>) -> Vec<Document> {
    for patient in &mut patients {
        patient.entry("locations").or_insert_with(|| json!([]));
    }
    patients
}

fn referenced(lists: &[Vec<usize>]) -> BTreeSet<usize> {
    lists.iter().flatten().copied().collect()
}

proptest! {
    #[test]
    fn distinct_count_is_union_of_both_sides(
        adds in ref_lists(PATIENTS.len()),
        removes in ref_lists(PATIENTS.len()),
    ) {
        let store = patient_store();
        let engine = SyncEngine::new(&store);

        let result = engine
            .synchronize(
                &LOCATION_PATIENTS,
                Some(&locations(&adds, 0)),
                Some(&locations(&removes, 100)),
                &ActorContext::anonymous(),
            )
            .unwrap();

        let expected: BTreeSet<usize> = referenced(&adds).union(&referenced(&removes)).copied().collect();
        prop_assert_eq!(result.distinct_foreign_count, expected.len());
    }

    #[test]
    fn add_pass_is_idempotent(lists in ref_lists(PATIENTS.len())) {
        let store = patient_store();
        let engine = SyncEngine::new(&store);
        let actor = ActorContext::new(json!({"user": "prop"}));
        let add = locations(&lists, 0);

        engine.synchronize(&LOCATION_PATIENTS, Some(&add), None, &actor).unwrap();
        let once = store.list("patients").unwrap();
        engine.synchronize(&LOCATION_PATIENTS, Some(&add), None, &actor).unwrap();
        let twice = store.list("patients").unwrap();

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn add_then_remove_restores_patients(lists in ref_lists(PATIENTS.len())) {
        let store = patient_store();
        let engine = SyncEngine::new(&store);
        let original = store.list("patients").unwrap();
        let owners = locations(&lists, 0);

        engine.synchronize(&LOCATION_PATIENTS, Some(&owners), None, &ActorContext::anonymous()).unwrap();
        engine.synchronize(&LOCATION_PATIENTS, None, Some(&owners), &ActorContext::anonymous()).unwrap();

        prop_assert_eq!(store.list("patients").unwrap(), original);
    }

    #[test]
    fn add_then_remove_restores_patients_without_array(lists in ref_lists(PATIENTS.len())) {
        let store = patient_store_from(json!({"firstName": "Ada"}));
        let engine = SyncEngine::new(&store);
        let original = store.list("patients").unwrap();
        let owners = locations(&lists, 0);

        engine.synchronize(&LOCATION_PATIENTS, Some(&owners), None, &ActorContext::anonymous()).unwrap();
        engine.synchronize(&LOCATION_PATIENTS, None, Some(&owners), &ActorContext::anonymous()).unwrap();

        prop_assert_eq!(
            with_locations(store.list("patients").unwrap()),
            with_locations(original)
        );
    }

    /// Sessions may repeat an id; every occurrence counts.
    #[test]
    fn counter_delta_matches_occurrences(
        sessions in prop::collection::vec((0usize..3, prop::collection::vec(0..METRICS.len(), 0..4)), 0..6),
    ) {
        let store = MemoryStore::new();
        seed(&store, "metrics", &METRICS, json!({"sessionCount": 0}));
        let engine = SyncEngine::new(&store);

        let owners = Value::Array(
            sessions
                .iter()
                .map(|(id, refs)| {
                    let metrics: Vec<&str> = refs.iter().map(|&r| METRICS[r]).collect();
                    json!({"_id": format!("S{id}"), "metrics": metrics})
                })
                .collect(),
        );
        let mut expected: HashMap<&str, i64> = HashMap::new();
        for (_, refs) in &sessions {
            for &r in refs {
                *expected.entry(METRICS[r]).or_default() += 1;
            }
        }

        engine.synchronize(&SESSION_METRICS, Some(&owners), None, &ActorContext::anonymous()).unwrap();
        for metric in METRICS {
            let want = expected.get(metric).copied().unwrap_or(0);
            prop_assert_eq!(counter(&store, "metrics", metric, "sessionCount"), want);
        }

        engine.synchronize(&SESSION_METRICS, None, Some(&owners), &ActorContext::anonymous()).unwrap();
        for metric in METRICS {
            prop_assert_eq!(counter(&store, "metrics", metric, "sessionCount"), 0);
        }
    }
}
