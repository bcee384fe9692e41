//! Idempotent schema registration.
//!
//! Registers a decoded schema against the store exactly once per type.
//! A descriptor that already exists is an audited no-op; repeated runs
//! for the same type rely on that short-circuit rather than on the
//! caller checking first.

use tracing::debug;

use crate::audit::AuditLog;
use crate::error::{ImportError, Result};
use crate::schema::{DecodedSchema, SkippedIndex};
use crate::store::{StoreClient, TypeDescriptorBuilder};

/// Outcome of a registration attempt.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// A new descriptor was installed. `skipped` lists every index
    /// entry that was dropped along the way, whether it failed to
    /// decode or was rejected by the descriptor builder.
    Registered { skipped: Vec<SkippedIndex> },
    /// The store already holds a descriptor for this type; nothing was
    /// changed.
    AlreadyExists,
}

/// Register `decoded` under `type_name`, unless the store already has
/// a descriptor for it.
pub fn register(
    store: &dyn StoreClient,
    type_name: &str,
    decoded: &DecodedSchema,
    audit: &mut AuditLog,
) -> Result<RegisterOutcome> {
    let existing = store
        .type_descriptor(type_name)
        .map_err(ImportError::Registration)?;
    if existing.is_some() {
        audit.info(format!("found type descriptor for {type_name}"));
        return Ok(RegisterOutcome::AlreadyExists);
    }
    audit.info(format!("creating type descriptor for {type_name}"));

    let mut builder = TypeDescriptorBuilder::new(type_name);
    let mut skipped = Vec::new();

    if let Some(id) = &decoded.descriptor.id_property {
        audit.info(format!("creating id property {id} for type {type_name}"));
        builder.id_property(id);
    }
    if let Some(routing) = &decoded.descriptor.routing_property {
        audit.info(format!(
            "creating routing property {routing} for type {type_name}"
        ));
        builder.routing_property(routing);
    }

    // Entries the decoder already dropped (unknown index kind).
    for skip in &decoded.skipped {
        audit.warn(format!(
            "skipping index on {} for type {type_name}: unknown index kind {:?}",
            skip.property, skip.kind
        ));
        skipped.push(skip.clone());
    }

    // An index the builder rejects is skipped, not fatal; the id
    // property is indexed by the store itself, so a duplicate here is
    // routine.
    for index in &decoded.descriptor.indexes {
        debug!(
            "creating index {} ({}) for type {type_name}",
            index.property, index.kind
        );
        if let Err(reason) = builder.add_index(&index.property, index.kind) {
            audit.warn(format!(
                "skipping index on {} for type {type_name}: {reason}",
                index.property
            ));
            skipped.push(SkippedIndex {
                property: index.property.clone(),
                kind: index.kind.to_string(),
            });
        }
    }

    store
        .register_type_descriptor(builder.build())
        .map_err(ImportError::Registration)?;
    Ok(RegisterOutcome::Registered { skipped })
}
