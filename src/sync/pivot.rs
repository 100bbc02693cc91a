//! Inverts owner-centric change descriptors into per-foreign-document aggregates.
//!
//! Every reference on both sides is resolved before anything is aggregated, so
//! a single bad ref fails the pass with [`SyncError::InvalidReference`] and no
//! partial pivot is ever observed. Aggregates keep first-seen order, which keeps
//! the emitted write batches deterministic.

use std::collections::HashMap;

use serde_json::Value;

use super::error::SyncError;
use super::types::{ForeignAggregate, OwnerChangeDescriptor, Side};
use crate::document::{document_id, value_id, Document};

/// Foreign-id-keyed view of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    aggregates: Vec<ForeignAggregate>,
    index: HashMap<String, usize>,
}

impl Pivot {
    /// All aggregates, in first-seen order.
    pub fn aggregates(&self) -> &[ForeignAggregate] {
        &self.aggregates
    }

    pub fn get(&self, foreign_id: &str) -> Option<&ForeignAggregate> {
        self.index.get(foreign_id).map(|&i| &self.aggregates[i])
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    /// Aggregates with something to attach.
    pub fn attached(&self) -> impl Iterator<Item = &ForeignAggregate> {
        self.aggregates.iter().filter(|a| a.is_attached())
    }

    /// Aggregates with something to detach.
    pub fn detached(&self) -> impl Iterator<Item = &ForeignAggregate> {
        self.aggregates.iter().filter(|a| a.is_detached())
    }

    /// Unique foreign ids across the add and remove sides (a union, not a sum).
    pub fn distinct_foreign_count(&self) -> usize {
        // every aggregate exists because at least one side referenced it
        self.aggregates.len()
    }

    fn entry(&mut self, foreign_id: &str) -> &mut ForeignAggregate {
        let next = self.aggregates.len();
        let i = *self.index.entry(foreign_id.to_string()).or_insert(next);
        if i == next {
            self.aggregates.push(ForeignAggregate::new(foreign_id.to_string()));
        }
        &mut self.aggregates[i]
    }

    fn attach(&mut self, foreign_id: &str, owner_id: &str, summary: &Document) {
        let aggregate = self.entry(foreign_id);
        aggregate.add_occurrences += 1;
        // A repeated owner overwrites its earlier summary in place.
        match aggregate
            .attached_summaries
            .iter_mut()
            .find(|s| document_id(s).as_deref() == Some(owner_id))
        {
            Some(existing) => *existing = summary.clone(),
            None => aggregate.attached_summaries.push(summary.clone()),
        }
    }

    fn detach(&mut self, foreign_id: &str, owner_id: &str) {
        let aggregate = self.entry(foreign_id);
        aggregate.remove_occurrences += 1;
        aggregate.detached_owner_ids.insert(owner_id.to_string());
    }
}

/// Build the pivot for one pass from already-normalized descriptors.
pub fn pivot(
    add: &[OwnerChangeDescriptor],
    remove: &[OwnerChangeDescriptor],
) -> Result<Pivot, SyncError> {
    let add_ids = resolve_all(add, Side::Add)?;
    let remove_ids = resolve_all(remove, Side::Remove)?;

    let mut pivot = Pivot::default();
    for (descriptor, ids) in add.iter().zip(&add_ids) {
        for id in ids {
            pivot.attach(id, &descriptor.owner_id, &descriptor.owner_summary);
        }
    }
    for (descriptor, ids) in remove.iter().zip(&remove_ids) {
        for id in ids {
            pivot.detach(id, &descriptor.owner_id);
        }
    }

    tracing::trace!(
        aggregates = pivot.aggregates.len(),
        attached = pivot.attached().count(),
        detached = pivot.detached().count(),
        "pivot built"
    );
    Ok(pivot)
}

fn resolve_all(
    descriptors: &[OwnerChangeDescriptor],
    side: Side,
) -> Result<Vec<Vec<String>>, SyncError> {
    descriptors
        .iter()
        .map(|d| {
            let refs = match side {
                Side::Add => &d.add_foreign_refs,
                Side::Remove => &d.remove_foreign_refs,
            };
            refs.iter()
                .enumerate()
                .map(|(i, r)| resolve(r, side, &d.owner_id, i))
                .collect()
        })
        .collect()
}

fn resolve(reference: &Value, side: Side, owner_id: &str, position: usize) -> Result<String, SyncError> {
    value_id(reference).ok_or_else(|| {
        SyncError::InvalidReference(format!(
            "{side} ref #{position} of owner {owner_id} has no resolvable id: {reference}"
        ))
    })
}
