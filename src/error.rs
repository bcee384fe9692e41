//! Error types for snapshot import runs.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while importing a single snapshot file.
///
/// Only `UnknownIndexKind` and `SchemaConflict` are recoverable; both
/// are handled per-index inside schema decode/registration and never
/// escape a run. Everything else aborts the run (but never the
/// process).
#[derive(Debug, Error)]
pub enum ImportError {
    /// The byte layout of the stream does not match the snapshot
    /// grammar: bad tag bytes, negative counts, truncation, invalid
    /// UTF-8.
    #[error("malformed snapshot stream: {0}")]
    MalformedStream(String),

    /// A record carries a type name the run cannot resolve.
    #[error("unknown record type {found:?} (expected {expected:?})")]
    UnknownType { expected: String, found: String },

    /// An index specification names a kind we do not recognize. Caught
    /// per index entry during schema decode.
    #[error("unknown index kind {0:?}")]
    UnknownIndexKind(String),

    /// The descriptor builder or the store rejected an index or field
    /// as incompatible with what is already present. Caught per index
    /// entry during registration.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// A bulk write was rejected by the store. Fatal: no retry, and
    /// batches already written stay committed.
    #[error("bulk write rejected by store")]
    StoreWrite(#[source] StoreError),

    /// Registering the type descriptor failed outright.
    #[error("type registration failed")]
    Registration(#[source] StoreError),
}

impl ImportError {
    /// Fold an I/O failure from the stream reader into the malformed
    /// stream case. A truncated gzip stream surfaces as UnexpectedEof
    /// here, which is indistinguishable from any other layout
    /// violation at this layer.
    pub fn from_io(context: &str, err: std::io::Error) -> Self {
        Self::MalformedStream(format!("{context}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
