//! Batched replay of the record sequence.
//!
//! Records are accumulated into a buffer and handed to the store in
//! bounded bulk writes. Flush boundaries land before every
//! `batch_size`-th record after the first and unconditionally after
//! the final record, so the first record is never flushed on its own
//! by the modulo rule and the trailing partial batch is never lost.
//! This boundary placement reproduces the exporter's counterpart tool
//! and is covered by tests; don't "simplify" it without checking them.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ImportError, Result};
use crate::store::StoreClient;
use crate::wire::Record;

/// What a replay accomplished.
#[derive(Debug, Clone, Copy)]
pub struct BatchStats {
    /// Records handed to bulk writes, across all batches.
    pub total_written: u64,
    /// Bulk-write calls issued.
    pub flushes: u32,
    /// Wall time spent in the replay loop.
    pub elapsed: Duration,
}

/// Replay `records` into the store in batches of `batch_size`.
///
/// `total` is the object count from the stream header; the final flush
/// keys off it. A failed bulk write is fatal: no retry, and batches
/// already written stay committed in the store.
pub fn write_batches<I>(
    store: &dyn StoreClient,
    records: I,
    total: usize,
    batch_size: usize,
) -> Result<BatchStats>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let batch_size = batch_size.max(1);
    let start = Instant::now();
    let mut buffer: Vec<Record> = Vec::with_capacity(batch_size.min(total.max(1)));
    let mut total_written = 0u64;
    let mut flushes = 0u32;

    for (i, record) in records.into_iter().enumerate() {
        let record = record?;
        if i > 0 && i % batch_size == 0 {
            flush(store, &buffer, &mut total_written, &mut flushes)?;
            buffer.clear();
        }
        buffer.push(record);
        if i + 1 == total {
            // Final flush; the buffer is left as-is, the run is ending.
            flush(store, &buffer, &mut total_written, &mut flushes)?;
        }
    }

    Ok(BatchStats {
        total_written,
        flushes,
        elapsed: start.elapsed(),
    })
}

fn flush(
    store: &dyn StoreClient,
    buffer: &[Record],
    total_written: &mut u64,
    flushes: &mut u32,
) -> Result<()> {
    debug!("flushing batch of {} records", buffer.len());
    store.bulk_write(buffer).map_err(ImportError::StoreWrite)?;
    *total_written += buffer.len() as u64;
    *flushes += 1;
    Ok(())
}
