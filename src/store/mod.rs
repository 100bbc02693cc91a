//! Storage boundary for the sync engine.
//!
//! The engine only talks to storage through [`DocumentStore`]: a batch-write
//! primitive scoped to one collection, a point update with the same
//! `{filter, update}` shape, and simple lookups. Two implementations ship with
//! the crate: [`sqlite::SqliteStore`] for real use and [`memory::MemoryStore`]
//! for tests.

pub mod apply;
pub mod memory;
pub mod sqlite;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a [`DocumentStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error from the SQLite driver.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document is not in the shape an update requires.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The store's internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// The store refused the write (used by the in-memory fake).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Selects the document an update applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Filter {
    /// Match the document with this `_id`.
    Id { id: String },
    /// Match the document with this `_id` only if `array_field` already holds
    /// an entry whose `_id` is `embedded_id`.
    IdWithEmbedded {
        id: String,
        array_field: String,
        embedded_id: String,
    },
}

impl Filter {
    /// The `_id` of the targeted document.
    pub fn target_id(&self) -> &str {
        match self {
            Self::Id { id } | Self::IdWithEmbedded { id, .. } => id,
        }
    }
}

/// A single update primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Update {
    /// Overwrite, field by field, the embedded entry whose `_id` matches
    /// `entry._id`. Fields absent from `entry` are left untouched.
    ReplaceEmbedded {
        array_field: String,
        entry: Document,
        updated_by: Option<Value>,
    },
    /// Append every entry whose `_id` is not already present in `array_field`.
    AddToSetById {
        array_field: String,
        entries: Vec<Document>,
        updated_by: Option<Value>,
    },
    /// Remove every entry of `array_field` whose id is in `ids`.
    PullById {
        array_field: String,
        ids: Vec<String>,
        updated_by: Option<Value>,
    },
    /// Add `delta` to an integer field (missing counts as zero).
    Increment { field: String, delta: i64 },
}

/// One `{filter, update}` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOp {
    pub filter: Filter,
    pub update: Update,
}

impl WriteOp {
    pub fn new(filter: Filter, update: Update) -> Self {
        Self { filter, update }
    }
}

/// Outcome of a write, as reported by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    /// Number of ops whose filter matched a document.
    pub matched: u64,
    /// Number of ops that changed the matched document.
    pub modified: u64,
}

impl WriteResult {
    pub(crate) fn record(&mut self, matched: bool, modified: bool) {
        if matched {
            self.matched += 1;
        }
        if modified {
            self.modified += 1;
        }
    }
}

/// A collection-scoped document store.
pub trait DocumentStore {
    /// Apply `ops` to `collection` as one batch.
    fn bulk_write(&self, collection: &str, ops: &[WriteOp]) -> StorageResult<WriteResult>;

    /// Apply a single op.
    fn update_one(&self, collection: &str, op: &WriteOp) -> StorageResult<WriteResult> {
        self.bulk_write(collection, std::slice::from_ref(op))
    }

    /// Fetch a document by `_id`.
    fn find_by_id(&self, collection: &str, id: &str) -> StorageResult<Option<Document>>;

    /// Insert or replace a document keyed by its `_id`.
    fn put(&self, collection: &str, doc: Document) -> StorageResult<()>;

    /// All documents in a collection, ordered by `_id`.
    fn list(&self, collection: &str) -> StorageResult<Vec<Document>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn bulk_write(&self, collection: &str, ops: &[WriteOp]) -> StorageResult<WriteResult> {
        (**self).bulk_write(collection, ops)
    }

    fn update_one(&self, collection: &str, op: &WriteOp) -> StorageResult<WriteResult> {
        (**self).update_one(collection, op)
    }

    fn find_by_id(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        (**self).find_by_id(collection, id)
    }

    fn put(&self, collection: &str, doc: Document) -> StorageResult<()> {
        (**self).put(collection, doc)
    }

    fn list(&self, collection: &str) -> StorageResult<Vec<Document>> {
        (**self).list(collection)
    }
}
