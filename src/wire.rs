//! Low-level decoding for the snapshot wire format.
//!
//! The grammar is fixed at exactly one revision: everything is
//! big-endian, strings are a u16 byte length followed by UTF-8, and
//! composite values carry a one-byte tag. There is no lookahead and no
//! framing beyond the lengths themselves, so every helper reads exactly
//! what it needs and nothing more.

use std::io::Read;

use crate::error::{ImportError, Result};

/// Value tag bytes. A record tag is only legal in the body of the
/// stream, never nested inside a schema value.
pub const TAG_STRING: u8 = 0x01;
pub const TAG_LIST: u8 = 0x02;
pub const TAG_MAP: u8 = 0x03;
pub const TAG_RECORD: u8 = 0x04;

/// A decoded tagged value: the generic nested-map encoding used for
/// the schema block. Maps keep their source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    String(String),
    List(Vec<WireValue>),
    Map(Vec<(String, WireValue)>),
}

impl WireValue {
    /// Look up a top-level map key. Returns `None` for non-map values
    /// as well; callers treat absence and wrong shape the same way.
    pub fn get(&self, key: &str) -> Option<&WireValue> {
        match self {
            Self::Map(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// An opaque serialized record instance. The importer never looks
/// inside `payload`; it only counts records and forwards them to the
/// store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub type_name: String,
    pub payload: Vec<u8>,
}

pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader
        .read_exact(&mut buf)
        .map_err(|e| ImportError::from_io("reading tag byte", e))?;
    Ok(buf[0])
}

pub fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| ImportError::from_io("reading i32", e))?;
    Ok(i32::from_be_bytes(buf))
}

/// Read a length-prefixed UTF-8 string (u16 byte length).
pub fn read_utf<R: Read>(reader: &mut R) -> Result<String> {
    let mut len_buf = [0u8; 2];
    reader
        .read_exact(&mut len_buf)
        .map_err(|e| ImportError::from_io("reading string length", e))?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut bytes = vec![0u8; len];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| ImportError::from_io("reading string bytes", e))?;
    String::from_utf8(bytes)
        .map_err(|e| ImportError::MalformedStream(format!("string is not valid UTF-8: {e}")))
}

/// Read one tagged schema value. Record tags are rejected here; those
/// only appear in the record section of the stream.
pub fn read_value<R: Read>(reader: &mut R) -> Result<WireValue> {
    let tag = read_u8(reader)?;
    match tag {
        TAG_STRING => Ok(WireValue::String(read_utf(reader)?)),
        TAG_LIST => {
            let count = read_len(reader, "list count")?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(reader)?);
            }
            Ok(WireValue::List(items))
        }
        TAG_MAP => {
            let count = read_len(reader, "map count")?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = read_utf(reader)?;
                let value = read_value(reader)?;
                pairs.push((key, value));
            }
            Ok(WireValue::Map(pairs))
        }
        other => Err(ImportError::MalformedStream(format!(
            "unexpected value tag 0x{other:02x}"
        ))),
    }
}

/// Read one record: tag, type name, payload length, payload.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Record> {
    let tag = read_u8(reader)?;
    if tag != TAG_RECORD {
        return Err(ImportError::MalformedStream(format!(
            "expected record tag, found 0x{tag:02x}"
        )));
    }
    let type_name = read_utf(reader)?;
    let len = read_len(reader, "record payload length")?;
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| ImportError::from_io("reading record payload", e))?;
    Ok(Record { type_name, payload })
}

fn read_len<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let len = read_i32(reader)?;
    usize::try_from(len)
        .map_err(|_| ImportError::MalformedStream(format!("negative {what}: {len}")))
}
