//! Helpers for building snapshot streams in tests.
//!
//! The import tool never writes snapshots itself, but its tests need
//! byte-accurate streams to decode. `SnapshotBuilder` assembles the
//! wire grammar directly, including deliberately broken variants
//! (wrong counts, foreign record types) for the failure-path tests.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::schema::{KEY_ID_PROPERTY, KEY_INDEXES, KEY_ROUTING_PROPERTY};
use crate::stream::DOCUMENT_SENTINEL;
use crate::wire::{TAG_LIST, TAG_MAP, TAG_RECORD, TAG_STRING};

pub struct SnapshotBuilder {
    class_name: String,
    explicit_type_name: Option<String>,
    id_property: Option<String>,
    routing_property: Option<String>,
    index_groups: Vec<(String, Vec<String>)>,
    records: Vec<(String, Vec<u8>)>,
    object_count_override: Option<i32>,
}

impl SnapshotBuilder {
    /// A snapshot for a concrete class.
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            explicit_type_name: None,
            id_property: None,
            routing_property: None,
            index_groups: Vec::new(),
            records: Vec::new(),
            object_count_override: None,
        }
    }

    /// A document snapshot: class name is the sentinel and the type
    /// name travels explicitly.
    pub fn document(type_name: &str) -> Self {
        let mut builder = Self::new(DOCUMENT_SENTINEL);
        builder.explicit_type_name = Some(type_name.to_string());
        builder
    }

    pub fn id_property(mut self, property: &str) -> Self {
        self.id_property = Some(property.to_string());
        self
    }

    pub fn routing_property(mut self, property: &str) -> Self {
        self.routing_property = Some(property.to_string());
        self
    }

    /// Add an index group; `kind` is written verbatim, so bogus kind
    /// strings can be produced on purpose.
    pub fn index_group(mut self, kind: &str, properties: &[&str]) -> Self {
        self.index_groups.push((
            kind.to_string(),
            properties.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    /// Append `n` records of the stream's own type.
    pub fn records(mut self, n: usize) -> Self {
        let type_name = self.stream_type_name();
        for i in 0..n {
            self.records.push((type_name.clone(), format!("record-{i}").into_bytes()));
        }
        self
    }

    /// Append one record with an explicit type name.
    pub fn record_of_type(mut self, type_name: &str, payload: &[u8]) -> Self {
        self.records.push((type_name.to_string(), payload.to_vec()));
        self
    }

    /// Force the header's object count to disagree with the number of
    /// records actually written.
    pub fn object_count_override(mut self, count: i32) -> Self {
        self.object_count_override = Some(count);
        self
    }

    fn stream_type_name(&self) -> String {
        self.explicit_type_name
            .clone()
            .unwrap_or_else(|| self.class_name.clone())
    }

    /// The uncompressed stream bytes.
    pub fn plain_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_utf(&mut out, &self.class_name);
        let count = self
            .object_count_override
            .unwrap_or(self.records.len() as i32);
        out.extend_from_slice(&count.to_be_bytes());
        if let Some(type_name) = &self.explicit_type_name {
            write_utf(&mut out, type_name);
        }
        self.write_schema(&mut out);
        for (type_name, payload) in &self.records {
            out.push(TAG_RECORD);
            write_utf(&mut out, type_name);
            out.extend_from_slice(&(payload.len() as i32).to_be_bytes());
            out.extend_from_slice(payload);
        }
        out
    }

    /// The gzip-compressed stream bytes.
    pub fn gz_bytes(&self) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.plain_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    /// Write the compressed snapshot to a file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.gz_bytes())
    }

    fn write_schema(&self, out: &mut Vec<u8>) {
        let mut pairs: u32 = 0;
        let mut body = Vec::new();

        if let Some(id) = &self.id_property {
            write_utf(&mut body, KEY_ID_PROPERTY);
            body.push(TAG_STRING);
            write_utf(&mut body, id);
            pairs += 1;
        }
        if let Some(routing) = &self.routing_property {
            write_utf(&mut body, KEY_ROUTING_PROPERTY);
            body.push(TAG_STRING);
            write_utf(&mut body, routing);
            pairs += 1;
        }
        if !self.index_groups.is_empty() {
            write_utf(&mut body, KEY_INDEXES);
            body.push(TAG_MAP);
            body.extend_from_slice(&(self.index_groups.len() as i32).to_be_bytes());
            for (kind, properties) in &self.index_groups {
                write_utf(&mut body, kind);
                body.push(TAG_LIST);
                body.extend_from_slice(&(properties.len() as i32).to_be_bytes());
                for property in properties {
                    body.push(TAG_STRING);
                    write_utf(&mut body, property);
                }
            }
            pairs += 1;
        }

        out.push(TAG_MAP);
        out.extend_from_slice(&(pairs as i32).to_be_bytes());
        out.extend_from_slice(&body);
    }
}

fn write_utf(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}
