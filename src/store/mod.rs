//! The store client boundary.
//!
//! The import core talks to the grid through [`StoreClient`]: look up
//! a type descriptor, register one, bulk-write records. Connection
//! bootstrap, credentials and cluster topology live behind whichever
//! implementation the caller constructs; the core only ever sees an
//! already-connected handle.

pub mod http;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{IndexKind, IndexSpec, SchemaDescriptor};
use crate::wire::Record;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Errors surfaced by a store client implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure talking to the grid.
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The grid answered but rejected the operation.
    #[error("store rejected operation (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// The grid's schema object for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_property: Option<String>,
    #[serde(default)]
    pub indexes: Vec<IndexEntry>,
}

/// One registered index on a type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub property: String,
    pub kind: String,
}

/// Builds a [`TypeDescriptor`] field by field, rejecting indexes that
/// conflict with what has already been added.
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    pub fn new(type_name: &str) -> Self {
        Self {
            descriptor: TypeDescriptor {
                type_name: type_name.to_string(),
                id_property: None,
                routing_property: None,
                indexes: Vec::new(),
            },
        }
    }

    pub fn id_property(&mut self, property: &str) -> &mut Self {
        self.descriptor.id_property = Some(property.to_string());
        self
    }

    pub fn routing_property(&mut self, property: &str) -> &mut Self {
        self.descriptor.routing_property = Some(property.to_string());
        self
    }

    /// Add a property index. A second index on the same property is a
    /// conflict; the caller decides whether that is fatal (the
    /// registrar skips it with a warning).
    pub fn add_index(&mut self, property: &str, kind: IndexKind) -> Result<&mut Self, String> {
        if self.descriptor.indexes.iter().any(|i| i.property == property) {
            return Err(format!(
                "duplicate index on property {property:?} for type {:?}",
                self.descriptor.type_name
            ));
        }
        self.descriptor.indexes.push(IndexEntry {
            property: property.to_string(),
            kind: kind.to_string(),
        });
        Ok(self)
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

impl TypeDescriptor {
    /// View this descriptor's schema fields as a [`SchemaDescriptor`],
    /// dropping entries whose kind string no longer parses.
    pub fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor {
            id_property: self.id_property.clone(),
            routing_property: self.routing_property.clone(),
            indexes: self
                .indexes
                .iter()
                .filter_map(|entry| {
                    entry.kind.parse().ok().map(|kind| IndexSpec {
                        property: entry.property.clone(),
                        kind,
                    })
                })
                .collect(),
        }
    }
}

/// An already-connected handle to the grid.
///
/// Implementations must be safe for concurrent use: several import
/// runs may issue bulk writes through one client at the same time.
pub trait StoreClient: Send + Sync {
    /// Fetch the descriptor registered for `type_name`, if any.
    fn type_descriptor(&self, type_name: &str) -> Result<Option<TypeDescriptor>, StoreError>;

    /// Install a new type descriptor.
    fn register_type_descriptor(&self, descriptor: TypeDescriptor) -> Result<(), StoreError>;

    /// Write a batch of records in one call.
    fn bulk_write(&self, records: &[Record]) -> Result<(), StoreError>;
}
