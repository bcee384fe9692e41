//! One import run, start to finish.
//!
//! A run walks a fixed path: open the compressed stream, decode the
//! header, reconcile the schema, replay every record in batches, then
//! report counts and duration. Whatever happens, the caller gets the
//! audit trail back and the stream is closed; a failed run ends in
//! `Aborted` with the error attached, never in a panic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditLog;
use crate::batch::write_batches;
use crate::error::{ImportError, Result};
use crate::registrar::register;
use crate::schema::decode_schema;
use crate::store::StoreClient;
use crate::stream::RecordStream;

/// Where a run is in its lifecycle. Terminal states are `Completed`
/// and `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    StreamOpened,
    SchemaRegistered,
    Replaying,
    Completed,
    Aborted,
}

/// Everything a run hands back to its caller. Returned on every exit
/// path; on abort the audit log simply ends at the point of failure.
#[derive(Debug)]
pub struct ImportReport {
    pub path: PathBuf,
    pub type_name: Option<String>,
    pub state: RunState,
    pub records_written: u64,
    pub elapsed: Duration,
    pub error: Option<ImportError>,
    pub audit: AuditLog,
}

impl ImportReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// A single import run over one snapshot file.
pub struct ImportRun {
    store: Arc<dyn StoreClient>,
    path: PathBuf,
    batch_size: usize,
}

impl ImportRun {
    pub fn new(store: Arc<dyn StoreClient>, path: PathBuf, batch_size: usize) -> Self {
        Self {
            store,
            path,
            batch_size,
        }
    }

    /// Execute the run to completion or fatal abort.
    pub fn run(self) -> ImportReport {
        let mut report = ImportReport {
            path: self.path.clone(),
            type_name: None,
            state: RunState::Idle,
            records_written: 0,
            elapsed: Duration::ZERO,
            error: None,
            audit: AuditLog::new(),
        };
        if let Err(err) = self.execute(&mut report) {
            let mut diagnostic = err.to_string();
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                diagnostic.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            tracing::error!("import of {} aborted: {diagnostic}", self.path.display());
            report.state = RunState::Aborted;
            report.error = Some(err);
        }
        report
    }

    fn execute(&self, report: &mut ImportReport) -> Result<()> {
        // The stream is dropped on every path out of this function,
        // which closes the underlying file.
        let mut stream = RecordStream::open(&self.path)?;
        report.state = RunState::StreamOpened;
        report
            .audit
            .info(format!("opened import file {}", self.path.display()));

        let header = stream.header().clone();
        report.type_name = Some(header.type_name.clone());

        let decoded = decode_schema(&header.schema);
        register(
            self.store.as_ref(),
            &header.type_name,
            &decoded,
            &mut report.audit,
        )?;
        report.state = RunState::SchemaRegistered;

        report.audit.info(format!(
            "found {} instances of {}",
            header.object_count,
            header.display_name()
        ));

        report.state = RunState::Replaying;
        let stats = write_batches(
            self.store.as_ref(),
            &mut stream,
            header.object_count as usize,
            self.batch_size,
        )?;
        report.records_written = stats.total_written;
        report.elapsed = stats.elapsed;
        report.audit.info(format!(
            "import operation took {} millis",
            stats.elapsed.as_millis()
        ));
        report.state = RunState::Completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testutil::SnapshotBuilder;
    use std::path::Path;

    fn run_snapshot(store: Arc<MemoryStore>, dir: &Path, builder: SnapshotBuilder) -> ImportReport {
        let path = dir.join("snapshot.snap.gz");
        builder.write_to(&path).unwrap();
        ImportRun::new(store, path, 1000).run()
    }

    #[test]
    fn empty_snapshot_completes_with_zero_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let report = run_snapshot(
            store.clone(),
            dir.path(),
            SnapshotBuilder::new("Customer").id_property("id"),
        );

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.records_written, 0);
        assert!(store.batch_sizes().is_empty());
        assert!(report
            .audit
            .lines()
            .any(|l| l == "found 0 instances of Customer"));
    }

    #[test]
    fn replays_all_records_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let path = dir.path().join("Customer.snap.gz");
        SnapshotBuilder::new("Customer")
            .id_property("id")
            .records(2500)
            .write_to(&path)
            .unwrap();

        let report = ImportRun::new(store.clone(), path, 1000).run();
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.records_written, 2500);
        assert_eq!(store.batch_sizes(), vec![1000, 1000, 500]);
        assert!(report
            .audit
            .lines()
            .any(|l| l.starts_with("import operation took")));
    }

    #[test]
    fn second_run_skips_registration() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let build = || {
            SnapshotBuilder::new("Customer")
                .id_property("id")
                .index_group("ORDERED", &["name"])
                .records(3)
        };

        let first = run_snapshot(store.clone(), dir.path(), build());
        assert!(first.succeeded());
        assert_eq!(store.register_calls(), 1);

        let second = run_snapshot(store.clone(), dir.path(), build());
        assert!(second.succeeded());
        assert_eq!(store.register_calls(), 1);
        assert!(second
            .audit
            .lines()
            .any(|l| l == "found type descriptor for Customer"));
    }

    #[test]
    fn document_snapshot_is_labelled_with_both_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let report = run_snapshot(
            store,
            dir.path(),
            SnapshotBuilder::document("Invoice").records(2),
        );
        assert!(report.succeeded());
        assert_eq!(report.type_name.as_deref(), Some("Invoice"));
        assert!(report
            .audit
            .lines()
            .any(|l| l == "found 2 instances of Invoice (document)"));
    }

    #[test]
    fn truncated_stream_aborts_but_returns_audit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let path = dir.path().join("Customer.snap.gz");
        // Header promises more records than the stream holds.
        SnapshotBuilder::new("Customer")
            .object_count_override(10)
            .records(2)
            .write_to(&path)
            .unwrap();

        let report = ImportRun::new(store, path, 1000).run();
        assert_eq!(report.state, RunState::Aborted);
        assert!(matches!(
            report.error,
            Some(ImportError::MalformedStream(_))
        ));
        // The trail up to the failure is preserved.
        assert!(report
            .audit
            .lines()
            .any(|l| l.starts_with("opened import file")));
        assert!(report
            .audit
            .lines()
            .any(|l| l == "found 10 instances of Customer"));
    }

    #[test]
    fn rejected_bulk_write_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.fail_writes();
        let report = run_snapshot(
            store.clone(),
            dir.path(),
            SnapshotBuilder::new("Customer").records(5),
        );
        assert_eq!(report.state, RunState::Aborted);
        assert!(matches!(report.error, Some(ImportError::StoreWrite(_))));
        // Schema registration happened before the write failed.
        assert_eq!(store.register_calls(), 1);
    }
}
