//! Common test utilities for gridload integration tests.

use std::path::{Path, PathBuf};

use gridload::testutil::SnapshotBuilder;

/// Write a snapshot of `count` records for `class` into `dir`,
/// returning the file path. Uses the exporter's file naming.
pub fn write_snapshot(dir: &Path, class: &str, partition: u32, count: usize) -> PathBuf {
    let path = dir.join(format!("{class}.{partition}.snap.gz"));
    SnapshotBuilder::new(class)
        .id_property("id")
        .routing_property("region")
        .index_group("ORDERED", &["name"])
        .records(count)
        .write_to(&path)
        .expect("failed to write test snapshot");
    path
}
