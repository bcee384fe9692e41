//! Streaming decoder over one snapshot file.
//!
//! A snapshot is a gzip-compressed byte stream: class name, object
//! count, an explicit type name when the class is the document
//! sentinel, the schema block, then exactly `object_count` records.
//! Decoding is strictly sequential and forward-only; the header is
//! read when the stream is opened and the records are yielded lazily
//! so a large snapshot never has to fit in memory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{ImportError, Result};
use crate::wire::{self, Record, WireValue};

/// Class name reserved for schema-less document streams; the concrete
/// type name follows it explicitly in the stream.
pub const DOCUMENT_SENTINEL: &str = "document";

/// The decoded stream header.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    pub class_name: String,
    pub object_count: i32,
    pub is_document_type: bool,
    pub type_name: String,
    pub schema: WireValue,
}

impl StreamHeader {
    /// The label used in audit lines: the type name, qualified with
    /// the class name when the two differ.
    pub fn display_name(&self) -> String {
        if self.is_document_type {
            format!("{} ({})", self.type_name, self.class_name)
        } else {
            self.type_name.clone()
        }
    }
}

/// Lazy record decoder positioned just past the header.
///
/// Yields exactly `object_count` records and then `None`. The
/// underlying file handle is released when the stream is dropped, on
/// every exit path including decode failure.
#[derive(Debug)]
pub struct RecordStream<R: BufRead> {
    reader: R,
    header: StreamHeader,
    remaining: i32,
}

impl RecordStream<BufReader<GzDecoder<BufReader<File>>>> {
    /// Open a snapshot file and decode its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| ImportError::from_io(&format!("opening {}", path.display()), e))?;
        let reader = BufReader::with_capacity(256 * 1024, file);
        let decoder = GzDecoder::new(reader);
        Self::from_reader(BufReader::with_capacity(256 * 1024, decoder))
    }
}

impl<R: BufRead> RecordStream<R> {
    /// Decode the header from an already-decompressed reader.
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let class_name = wire::read_utf(&mut reader)?;
        let object_count = wire::read_i32(&mut reader)?;
        if object_count < 0 {
            return Err(ImportError::MalformedStream(format!(
                "negative object count: {object_count}"
            )));
        }

        let is_document_type = class_name == DOCUMENT_SENTINEL;
        let type_name = if is_document_type {
            wire::read_utf(&mut reader)?
        } else {
            class_name.clone()
        };
        if type_name.is_empty() {
            return Err(ImportError::MalformedStream(
                "empty type name in stream header".to_string(),
            ));
        }

        let schema = wire::read_value(&mut reader)?;
        if !matches!(schema, WireValue::Map(_)) {
            return Err(ImportError::MalformedStream(
                "schema block is not a map".to_string(),
            ));
        }

        Ok(Self {
            reader,
            header: StreamHeader {
                class_name,
                object_count,
                is_document_type,
                type_name,
                schema,
            },
            remaining: object_count,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let record = match wire::read_record(&mut self.reader) {
            Ok(record) => record,
            Err(e) => {
                // Poison the stream; a decode error is fatal to the run.
                self.remaining = 0;
                return Some(Err(e));
            }
        };
        if record.type_name != self.header.type_name {
            self.remaining = 0;
            return Some(Err(ImportError::UnknownType {
                expected: self.header.type_name.clone(),
                found: record.type_name,
            }));
        }
        Some(Ok(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SnapshotBuilder;

    #[test]
    fn decodes_header_and_records_in_order() {
        let bytes = SnapshotBuilder::new("Customer")
            .id_property("id")
            .records(3)
            .plain_bytes();
        let mut stream = RecordStream::from_reader(bytes.as_slice()).unwrap();

        let header = stream.header().clone();
        assert_eq!(header.class_name, "Customer");
        assert_eq!(header.type_name, "Customer");
        assert!(!header.is_document_type);
        assert_eq!(header.object_count, 3);

        let records: Vec<Record> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.type_name == "Customer"));
    }

    #[test]
    fn document_stream_carries_explicit_type_name() {
        let bytes = SnapshotBuilder::document("Invoice").records(1).plain_bytes();
        let stream = RecordStream::from_reader(bytes.as_slice()).unwrap();
        let header = stream.header();
        assert_eq!(header.class_name, DOCUMENT_SENTINEL);
        assert!(header.is_document_type);
        assert_eq!(header.type_name, "Invoice");
        assert_eq!(header.display_name(), "Invoice (document)");
    }

    #[test]
    fn truncated_record_section_is_malformed() {
        let mut bytes = SnapshotBuilder::new("Customer").records(2).plain_bytes();
        bytes.truncate(bytes.len() - 4);
        let mut stream = RecordStream::from_reader(bytes.as_slice()).unwrap();

        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(err, ImportError::MalformedStream(_)));
        // The stream is poisoned after the failure.
        assert!(stream.next().is_none());
    }

    #[test]
    fn foreign_record_type_is_unknown_type() {
        let bytes = SnapshotBuilder::new("Customer")
            .record_of_type("Order", b"xx")
            .plain_bytes();
        let mut stream = RecordStream::from_reader(bytes.as_slice()).unwrap();
        let err = stream.next().unwrap().unwrap_err();
        match err {
            ImportError::UnknownType { expected, found } => {
                assert_eq!(expected, "Customer");
                assert_eq!(found, "Order");
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn negative_object_count_is_malformed() {
        let bytes = SnapshotBuilder::new("Customer")
            .object_count_override(-5)
            .plain_bytes();
        let err = RecordStream::from_reader(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, ImportError::MalformedStream(_)));
    }

    #[test]
    fn gzip_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Customer.snap.gz");
        SnapshotBuilder::new("Customer")
            .records(5)
            .write_to(&path)
            .unwrap();

        let mut stream = RecordStream::open(&path).unwrap();
        assert_eq!(stream.header().object_count, 5);
        assert_eq!(stream.by_ref().filter_map(|r| r.ok()).count(), 5);
    }
}
