//! Denormalized reference synchronization for document-style record stores.
//!
//! Records such as locations and patients embed summaries of each other, so a
//! many-to-many link is stored twice. `refsync` keeps the second copy honest:
//! given the owner-side change, it computes the minimal, deduplicated set of
//! updates for the foreign side and issues them as batch writes.
//!
//! | Relation | Mode | Foreign-side effect |
//! |----------|------|---------------------|
//! | Location ↔ Patient | Summary | embedded `locations` / `patients` summaries |
//! | MetricGroup ↔ Metric | Summary | embedded `metrics` / `metricGroups` summaries |
//! | Session → MetricGroup | Counter | `sessionCount` on the group |
//! | Session → Metric | Counter | `sessionCount` on the metric |
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, and migrations
//! - [`document`]: JSON document and reference-id helpers
//! - [`store`]: the storage boundary, with SQLite and in-memory implementations
//! - [`sync`]: the sync engine: normalize, pivot, emit, write

pub mod config;
pub mod db;
pub mod document;
pub mod store;
pub mod sync;
