//! In-memory [`DocumentStore`] for tests and dry runs.
//!
//! Counts batch writes and can be told to fail specific calls, which is how the
//! engine's no-write and partial-failure behaviour gets exercised.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::apply::apply_op;
use super::{DocumentStore, StorageError, StorageResult, WriteOp, WriteResult};
use crate::document::{document_id, Document};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, Document>>,
    write_calls: usize,
    single_writes: usize,
    fail_on: HashSet<usize>,
}

/// A `Mutex`-guarded map of collections. Batch writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `bulk_write`/`update_one` calls received so far.
    pub fn write_calls(&self) -> usize {
        self.lock().map(|s| s.write_calls).unwrap_or(0)
    }

    /// How many of those calls came through `update_one`.
    pub fn single_writes(&self) -> usize {
        self.lock().map(|s| s.single_writes).unwrap_or(0)
    }

    /// Make the `n`th write call (1-based, counted over the store's lifetime)
    /// fail with [`StorageError::Unavailable`] without applying anything.
    pub fn fail_call(&self, n: usize) {
        if let Ok(mut state) = self.lock() {
            state.fail_on.insert(n);
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl DocumentStore for MemoryStore {
    fn bulk_write(&self, collection: &str, ops: &[WriteOp]) -> StorageResult<WriteResult> {
        let mut state = self.lock()?;
        state.write_calls += 1;
        let call = state.write_calls;
        if state.fail_on.contains(&call) {
            return Err(StorageError::Unavailable(format!(
                "injected failure on write call {call}"
            )));
        }

        let mut docs = state.collections.get(collection).cloned().unwrap_or_default();
        let mut result = WriteResult::default();
        for op in ops {
            let (matched, modified) = apply_op(docs.get_mut(op.filter.target_id()), op)?;
            result.record(matched, modified);
        }
        state.collections.insert(collection.to_string(), docs);
        Ok(result)
    }

    fn update_one(&self, collection: &str, op: &WriteOp) -> StorageResult<WriteResult> {
        self.lock()?.single_writes += 1;
        self.bulk_write(collection, std::slice::from_ref(op))
    }

    fn find_by_id(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn put(&self, collection: &str, doc: Document) -> StorageResult<()> {
        let id = document_id(&doc)
            .ok_or_else(|| StorageError::InvalidData("document has no `_id`".into()))?;
        let mut state = self.lock()?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, doc);
        Ok(())
    }

    fn list(&self, collection: &str) -> StorageResult<Vec<Document>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
