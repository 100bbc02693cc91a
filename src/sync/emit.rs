//! Update-op emission.
//!
//! [`emit`] turns a [`Pivot`] into logical [`UpdateOp`]s, at most one add and
//! one remove per foreign id. [`write_ops`] lowers those into the store's
//! `{filter, update}` primitives:
//!
//! | mode | kind | writes per foreign id |
//! |------|------|-----------------------|
//! | summary | add | one in-place replace per owner summary, then one add-to-set of all summaries |
//! | summary | remove | one pull of the detached owner ids |
//! | counter | add / remove | one increment by ± occurrence count |
//!
//! Replace-then-add-to-set is what makes repeated syncs idempotent: entries
//! already embedded are refreshed field by field, and only unseen owner ids
//! are appended.

use serde_json::Value;

use super::error::SyncError;
use super::pivot::Pivot;
use super::types::{ActorContext, OpPayload, Relation, Side, SyncMode, UpdateOp};
use crate::document::document_id;
use crate::store::{Filter, Update, WriteOp};

/// Logical ops for one pass, split by side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmittedOps {
    pub add: Vec<UpdateOp>,
    pub remove: Vec<UpdateOp>,
}

impl EmittedOps {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Emit the logical ops for `pivot` under `relation`'s mode.
pub fn emit(relation: &Relation, pivot: &Pivot) -> EmittedOps {
    let add = pivot
        .attached()
        .map(|a| UpdateOp {
            target_id: a.foreign_id.clone(),
            kind: Side::Add,
            payload: match relation.mode {
                SyncMode::Summary { .. } => OpPayload::Attach(a.attached_summaries.clone()),
                SyncMode::Counter { .. } => OpPayload::Counter(i64::from(a.add_occurrences)),
            },
        })
        .collect();

    let remove = pivot
        .detached()
        .map(|a| UpdateOp {
            target_id: a.foreign_id.clone(),
            kind: Side::Remove,
            payload: match relation.mode {
                SyncMode::Summary { .. } => {
                    OpPayload::Detach(a.detached_owner_ids.iter().cloned().collect())
                }
                SyncMode::Counter { .. } => {
                    OpPayload::Counter(-i64::from(a.remove_occurrences))
                }
            },
        })
        .collect();

    EmittedOps { add, remove }
}

/// Lower logical ops into store writes for `relation`'s foreign collection.
pub fn write_ops(
    relation: &Relation,
    ops: &[UpdateOp],
    actor: &ActorContext,
) -> Result<Vec<WriteOp>, SyncError> {
    let stamp = actor.stamp();
    let mut writes = Vec::new();
    for op in ops {
        lower(relation, op, stamp.as_ref(), &mut writes)?;
    }
    Ok(writes)
}

fn lower(
    relation: &Relation,
    op: &UpdateOp,
    stamp: Option<&Value>,
    writes: &mut Vec<WriteOp>,
) -> Result<(), SyncError> {
    let target = || Filter::Id {
        id: op.target_id.clone(),
    };

    match (relation.mode, &op.payload) {
        (SyncMode::Summary { foreign_refs_field, .. }, OpPayload::Attach(summaries)) => {
            for summary in summaries {
                let owner_id = document_id(summary).ok_or_else(|| {
                    SyncError::MalformedInput(format!(
                        "summary for {} has no `_id`",
                        op.target_id
                    ))
                })?;
                writes.push(WriteOp::new(
                    Filter::IdWithEmbedded {
                        id: op.target_id.clone(),
                        array_field: foreign_refs_field.to_string(),
                        embedded_id: owner_id,
                    },
                    Update::ReplaceEmbedded {
                        array_field: foreign_refs_field.to_string(),
                        entry: summary.clone(),
                        updated_by: stamp.cloned(),
                    },
                ));
            }
            writes.push(WriteOp::new(
                target(),
                Update::AddToSetById {
                    array_field: foreign_refs_field.to_string(),
                    entries: summaries.clone(),
                    updated_by: stamp.cloned(),
                },
            ));
        }
        (SyncMode::Summary { foreign_refs_field, .. }, OpPayload::Detach(owner_ids)) => {
            writes.push(WriteOp::new(
                target(),
                Update::PullById {
                    array_field: foreign_refs_field.to_string(),
                    ids: owner_ids.clone(),
                    updated_by: stamp.cloned(),
                },
            ));
        }
        (SyncMode::Counter { counter_field }, OpPayload::Counter(delta)) => {
            writes.push(WriteOp::new(
                target(),
                Update::Increment {
                    field: counter_field.to_string(),
                    delta: *delta,
                },
            ));
        }
        (_, payload) => {
            return Err(SyncError::MalformedInput(format!(
                "{:?} payload does not fit {} relation {}",
                payload,
                relation.mode_name(),
                relation.name
            )))
        }
    }
    Ok(())
}
