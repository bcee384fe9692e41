//! Gridload library - snapshot import for a schema-aware data grid.
//!
//! A snapshot file is one gzip-compressed binary stream holding a
//! class name, an object count, a type schema, and that many
//! serialized records. This crate decodes such streams, reconciles the
//! grid's schema for the type, and replays the records with bounded
//! bulk writes, keeping an audit trail of every decision.
//!
//! # Modules
//!
//! - [`wire`] - the fixed binary wire grammar
//! - [`stream`] - lazy record decoding over one compressed snapshot
//! - [`schema`] - the type-schema block and its decoder
//! - [`registrar`] - idempotent schema registration
//! - [`batch`] - batched bulk-write replay
//! - [`pipeline`] - the run state machine tying it all together
//! - [`store`] - the grid client boundary (HTTP adapter, in-memory test store)
//! - [`audit`] - the per-run audit trail
//! - [`testutil`] - snapshot builders for tests

pub mod audit;
pub mod batch;
pub mod error;
pub mod pipeline;
pub mod registrar;
pub mod schema;
pub mod store;
pub mod stream;
pub mod testutil;
pub mod wire;

// Re-export for convenience
pub use audit::{AuditEntry, AuditLog};
pub use error::ImportError;
pub use pipeline::{ImportReport, ImportRun, RunState};
pub use store::{HttpStore, MemoryStore, StoreClient};
pub use wire::Record;
