//! In-memory store used by tests.
//!
//! Keeps registered descriptors and every bulk-write batch it was
//! handed, so tests can assert on batch boundaries and idempotence.
//! Interior mutability makes it shareable across worker threads the
//! same way a real client handle is.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::store::{StoreClient, StoreError, TypeDescriptor};
use crate::wire::Record;

#[derive(Default)]
pub struct MemoryStore {
    descriptors: Mutex<Vec<TypeDescriptor>>,
    batches: Mutex<Vec<Vec<Record>>>,
    register_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent bulk write fail, to exercise the fatal
    /// write path.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Sizes of the batches received so far, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// Every record received, flattened across batches, in order.
    pub fn written_records(&self) -> Vec<Record> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    /// How many times `register_type_descriptor` was called.
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn descriptors(&self) -> Vec<TypeDescriptor> {
        self.descriptors.lock().unwrap().clone()
    }
}

impl StoreClient for MemoryStore {
    fn type_descriptor(&self, type_name: &str) -> Result<Option<TypeDescriptor>, StoreError> {
        Ok(self
            .descriptors
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.type_name == type_name)
            .cloned())
    }

    fn register_type_descriptor(&self, descriptor: TypeDescriptor) -> Result<(), StoreError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.descriptors.lock().unwrap().push(descriptor);
        Ok(())
    }

    fn bulk_write(&self, records: &[Record]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                status: 503,
                message: "write rejected".to_string(),
            });
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}
