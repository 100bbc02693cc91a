//! SQLite-backed [`DocumentStore`].
//!
//! Each document is one JSON body in the `documents` table. A batch write loads
//! every targeted document once, applies the ops in order, writes back only the
//! documents that changed, and appends a row to `write_log`, all inside one
//! transaction.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::apply::apply_op;
use super::{DocumentStore, StorageError, StorageResult, WriteOp, WriteResult};
use crate::db;
use crate::document::{document_id, Document};

/// A [`DocumentStore`] over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an existing connection, bringing its schema up to date.
    pub fn new(conn: Connection) -> StorageResult<Self> {
        db::schema::init_schema(&conn)?;
        db::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> anyhow::Result<Self> {
        let conn = db::open_database(path, busy_timeout)?;
        Ok(Self::new(conn)?)
    }

    /// A fresh in-memory database.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = db::open_memory_database()?;
        Ok(Self::new(conn)?)
    }

    /// Number of rows in the write audit log for `collection`.
    pub fn logged_writes(&self, collection: &str) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM write_log WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl DocumentStore for SqliteStore {
    fn bulk_write(&self, collection: &str, ops: &[WriteOp]) -> StorageResult<WriteResult> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut loaded: HashMap<String, Option<Document>> = HashMap::new();
        let mut dirty: BTreeSet<String> = BTreeSet::new();
        let mut result = WriteResult::default();

        for op in ops {
            let id = op.filter.target_id();
            if !loaded.contains_key(id) {
                let doc = load(&tx, collection, id)?;
                loaded.insert(id.to_string(), doc);
            }
            let doc = loaded.get_mut(id).and_then(Option::as_mut);
            let (matched, modified) = apply_op(doc, op)?;
            if modified {
                dirty.insert(id.to_string());
            }
            result.record(matched, modified);
        }

        let now = chrono::Utc::now().to_rfc3339();
        for id in &dirty {
            if let Some(Some(doc)) = loaded.get(id) {
                save(&tx, collection, id, doc, &now)?;
            }
        }

        tx.execute(
            "INSERT INTO write_log (collection, op_count, matched, modified, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                collection,
                ops.len() as i64,
                result.matched as i64,
                result.modified as i64,
                now
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            collection,
            ops = ops.len(),
            matched = result.matched,
            modified = result.modified,
            "bulk write committed"
        );
        Ok(result)
    }

    fn find_by_id(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let conn = self.lock()?;
        load(&conn, collection, id)
    }

    fn put(&self, collection: &str, doc: Document) -> StorageResult<()> {
        let id = document_id(&doc)
            .ok_or_else(|| StorageError::InvalidData("document has no `_id`".into()))?;
        let conn = self.lock()?;
        save(&conn, collection, &id, &doc, &chrono::Utc::now().to_rfc3339())
    }

    fn list(&self, collection: &str) -> StorageResult<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")?;
        let bodies = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies.iter().map(|body| parse_body(body)).collect()
    }
}

fn load(conn: &Connection, collection: &str, id: &str) -> StorageResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    body.as_deref().map(parse_body).transpose()
}

fn save(conn: &Connection, collection: &str, id: &str, doc: &Document, now: &str) -> StorageResult<()> {
    let body = serde_json::to_string(doc)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![collection, id, body, now],
    )?;
    Ok(())
}

fn parse_body(body: &str) -> StorageResult<Document> {
    match serde_json::from_str(body)? {
        serde_json::Value::Object(doc) => Ok(doc),
        _ => Err(StorageError::InvalidData("stored body is not an object".into())),
    }
}
