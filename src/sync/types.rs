//! Core type definitions for reference synchronization.
//!
//! Defines [`EntityKind`] (the record collections), [`Relation`] and
//! [`SyncMode`] (how one side of a many-to-many link is mirrored onto the
//! other), and the intermediate values that flow through a sync pass:
//! [`OwnerChangeDescriptor`], [`ForeignAggregate`], [`UpdateOp`], and the final
//! [`SyncResult`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::store::WriteResult;

/// The record kinds managed by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Patient,
    Location,
    Metric,
    MetricGroup,
    Session,
    Result,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Patient,
        Self::Location,
        Self::Metric,
        Self::MetricGroup,
        Self::Session,
        Self::Result,
    ];

    /// Name of the collection holding documents of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Patient => "patients",
            Self::Location => "locations",
            Self::Metric => "metrics",
            Self::MetricGroup => "metricgroups",
            Self::Session => "sessions",
            Self::Result => "results",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// How a relation is mirrored onto the foreign side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Keep an embedded array of owner summaries on each foreign document.
    Summary {
        /// Owner fields copied into the summary, after `_id`.
        summary_shape: &'static [&'static str],
        /// Array field on the foreign document holding the summaries.
        foreign_refs_field: &'static str,
    },
    /// Keep a count of referencing owners on each foreign document.
    Counter {
        /// Integer field on the foreign document.
        counter_field: &'static str,
    },
}

/// One direction of a many-to-many link, declared at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Stable identifier, e.g. `"location-patients"`.
    pub name: &'static str,
    /// Kind of the document whose change triggers the sync.
    pub owner_kind: EntityKind,
    /// Kind of the documents kept consistent reactively.
    pub foreign_kind: EntityKind,
    /// Array field on the owner listing its foreign references.
    pub owner_refs_field: &'static str,
    pub mode: SyncMode,
}

impl Relation {
    /// Collection the sync pass writes to.
    pub fn foreign_collection(&self) -> &'static str {
        self.foreign_kind.collection()
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            SyncMode::Summary { .. } => "summary",
            SyncMode::Counter { .. } => "counter",
        }
    }
}

/// Which half of a pass an input belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Add,
    Remove,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Remove => "remove",
        })
    }
}

/// One owner's contribution to a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerChangeDescriptor {
    pub owner_id: String,
    /// `_id` plus the summary-shape fields found on the owner.
    pub owner_summary: Document,
    /// Raw references to attach; resolved during pivoting.
    pub add_foreign_refs: Vec<Value>,
    /// Raw references to detach; resolved during pivoting.
    pub remove_foreign_refs: Vec<Value>,
}

/// Everything one pass does to a single foreign document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForeignAggregate {
    pub foreign_id: String,
    /// Owner summaries to attach, at most one per owner id.
    pub attached_summaries: Vec<Document>,
    /// Every add reference to this id, duplicates included.
    pub add_occurrences: u32,
    pub detached_owner_ids: BTreeSet<String>,
    /// Every remove reference to this id, duplicates included.
    pub remove_occurrences: u32,
}

impl ForeignAggregate {
    pub(crate) fn new(foreign_id: String) -> Self {
        Self {
            foreign_id,
            ..Self::default()
        }
    }

    pub fn is_attached(&self) -> bool {
        self.add_occurrences > 0
    }

    pub fn is_detached(&self) -> bool {
        self.remove_occurrences > 0
    }
}

/// What an op carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpPayload {
    /// Owner summaries to upsert into the embedded array.
    Attach(Vec<Document>),
    /// Owner ids to pull from the embedded array.
    Detach(Vec<String>),
    /// Signed counter delta.
    Counter(i64),
}

/// One logical instruction against one foreign document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOp {
    pub target_id: String,
    pub kind: Side,
    pub payload: OpPayload,
}

/// Opaque audit stamp of whoever performed the change.
///
/// Forwarded verbatim onto documents touched by summary writes; the engine
/// never looks inside it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorContext(Value);

impl ActorContext {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// An actor that stamps nothing.
    pub fn anonymous() -> Self {
        Self(Value::Null)
    }

    /// The stamp to write, or `None` for an anonymous actor.
    pub fn stamp(&self) -> Option<Value> {
        match &self.0 {
            Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncResult {
    /// Raw store result of the add-side batch, if one was issued.
    pub add: Option<WriteResult>,
    /// Raw store result of the remove-side batch, if one was issued.
    pub remove: Option<WriteResult>,
    /// Unique foreign ids touched by either side.
    pub distinct_foreign_count: usize,
}

impl SyncResult {
    /// Total documents the store reports as modified across both batches.
    pub fn modified(&self) -> u64 {
        self.add.map_or(0, |r| r.modified) + self.remove.map_or(0, |r| r.modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_kind_round_trips_through_collection_name() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.collection().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("doctors".parse::<EntityKind>().is_err());
    }

    #[test]
    fn anonymous_actor_stamps_nothing() {
        assert_eq!(ActorContext::anonymous().stamp(), None);
        assert_eq!(
            ActorContext::new(json!({"user": "u1"})).stamp(),
            Some(json!({"user": "u1"}))
        );
    }

    #[test]
    fn sync_result_sums_modified() {
        let result = SyncResult {
            add: Some(WriteResult { matched: 3, modified: 2 }),
            remove: Some(WriteResult { matched: 1, modified: 1 }),
            distinct_foreign_count: 3,
        };
        assert_eq!(result.modified(), 3);
        assert_eq!(SyncResult::default().modified(), 0);
    }
}
