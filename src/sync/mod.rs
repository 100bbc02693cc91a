//! Bidirectional denormalized reference synchronization.
//!
//! A pass takes owner-side changes (documents to attach, documents to detach)
//! for one [`Relation`] and brings the foreign collection back in line:
//!
//! 1. [`normalize`](normalize::normalize) accepts `null`, an owner object, or an
//!    array of them per side.
//! 2. [`pivot`](pivot::pivot) inverts owners → foreign ids, deduplicating so each
//!    foreign document gets at most one add and one remove instruction.
//! 3. [`emit`](emit::emit) builds summary upserts/pulls or counter deltas.
//! 4. [`SyncEngine`] writes the add batch, then the remove batch.

pub mod diff;
pub mod emit;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod pivot;
pub mod relations;
pub mod types;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use types::{ActorContext, EntityKind, Relation, SyncMode, SyncResult};
