//! The sync pass: normalize → pivot → emit → write.
//!
//! [`SyncEngine`] owns nothing but its store handle. A pass maintains only the
//! foreign side of a relation; the owner document is written by its own
//! controller before the pass runs. There is no cross-collection transaction:
//! the add batch and the remove batch are separate writes, and a failure in one
//! does not undo the other.

use serde_json::Value;
use tracing::{info_span, warn};

use super::emit::{emit, write_ops};
use super::error::SyncError;
use super::normalize::normalize;
use super::pivot::pivot;
use super::types::{ActorContext, Relation, Side, SyncResult, UpdateOp};
use crate::store::{DocumentStore, StorageError, WriteOp, WriteResult};

/// Runs sync passes against an injected [`DocumentStore`].
#[derive(Debug)]
pub struct SyncEngine<S> {
    store: S,
}

impl<S: DocumentStore> SyncEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run one pass for `relation`.
    ///
    /// `add` and `remove` are each `null`, an owner object, or an array of
    /// owner objects. Validation errors are returned before any write. The add
    /// batch is written first; the remove batch is attempted once the add batch
    /// has settled, whether or not it succeeded. If both fail, the add error is
    /// the one returned.
    pub fn synchronize(
        &self,
        relation: &Relation,
        add: Option<&Value>,
        remove: Option<&Value>,
        actor: &ActorContext,
    ) -> Result<SyncResult, SyncError> {
        let pass_id = uuid::Uuid::now_v7();
        let span = info_span!("sync", relation = relation.name, %pass_id);
        let _guard = span.enter();

        let add_descriptors = normalize(relation, add, Side::Add)?;
        let remove_descriptors = normalize(relation, remove, Side::Remove)?;
        let pivot = pivot(&add_descriptors, &remove_descriptors)?;
        let ops = emit(relation, &pivot);

        let add_writes = write_ops(relation, &ops.add, actor)?;
        let remove_writes = write_ops(relation, &ops.remove, actor)?;

        tracing::debug!(
            owners_added = add_descriptors.len(),
            owners_removed = remove_descriptors.len(),
            foreign_ids = pivot.distinct_foreign_count(),
            add_ops = add_writes.len(),
            remove_ops = remove_writes.len(),
            "sync pass planned"
        );

        let collection = relation.foreign_collection();
        let add_result = self.write_side(collection, Side::Add, &ops.add, &add_writes);
        let remove_result = self.write_side(collection, Side::Remove, &ops.remove, &remove_writes);

        let (add, remove) = match (add_result, remove_result) {
            (Ok(add), Ok(remove)) => (add, remove),
            (Err(e), other) => {
                if matches!(other, Ok(Some(_))) {
                    warn!(error = %e, "add batch failed but remove batch applied; foreign side partially synchronized");
                }
                return Err(e.into());
            }
            (Ok(add), Err(e)) => {
                if add.is_some() {
                    warn!(error = %e, "remove batch failed after add batch applied; foreign side partially synchronized");
                }
                return Err(e.into());
            }
        };

        let result = SyncResult {
            add,
            remove,
            distinct_foreign_count: pivot.distinct_foreign_count(),
        };
        tracing::info!(
            foreign_ids = result.distinct_foreign_count,
            modified = result.modified(),
            "sync pass complete"
        );
        Ok(result)
    }

    /// Issue one side's batch. An empty batch is never sent to the store, and
    /// a lone write goes through the point-update primitive.
    fn write_side(
        &self,
        collection: &str,
        side: Side,
        ops: &[UpdateOp],
        writes: &[WriteOp],
    ) -> Result<Option<WriteResult>, StorageError> {
        if writes.is_empty() {
            return Ok(None);
        }
        tracing::debug!(%side, foreign_ids = ops.len(), writes = writes.len(), collection, "issuing batch");
        match writes {
            [single] => self.store.update_one(collection, single).map(Some),
            _ => self.store.bulk_write(collection, writes).map(Some),
        }
    }
}
