//! Stored layout of document rows
//!
//! A document occupies one row, keyed by its id:
//!
//! ```text
//! row   family   qualifier                      visibility   value
//! ----  -------  -----------------------------  -----------  ----------
//! <id>  refs     <ref-id>\0<attribute>          <label>      attr value
//! <id>  ~chunk   [CHUNK_SIZE:4][SEQUENCE:4]      <label>      chunk bytes
//! ```
//!
//! Both integers in a chunk qualifier are big-endian so that chunks sort by
//! size, then sequence number. The last chunk of a document has an empty value.

use crate::common::{Error, Result};
use bytes::Bytes;

/// Column family holding chunk data
pub const CHUNK_CF: &[u8] = b"~chunk";
/// Column family holding references and attributes of a document
pub const REFS_CF: &[u8] = b"refs";

const QUALIFIER_LEN: usize = 8;

/// Encode a chunk qualifier: `[CHUNK_SIZE:4][SEQUENCE:4]`
pub fn encode_chunk_qualifier(chunk_size: u32, sequence: u32) -> [u8; QUALIFIER_LEN] {
    let mut qualifier = [0u8; QUALIFIER_LEN];
    qualifier[..4].copy_from_slice(&chunk_size.to_be_bytes());
    qualifier[4..].copy_from_slice(&sequence.to_be_bytes());
    qualifier
}

/// Decode a chunk qualifier into `(chunk_size, sequence)`
pub fn decode_chunk_qualifier(qualifier: &[u8]) -> Result<(u32, u32)> {
    let bytes: [u8; QUALIFIER_LEN] = qualifier.try_into().map_err(|_| {
        Error::InvalidKey(format!(
            "chunk qualifier must be {} bytes, got {}",
            QUALIFIER_LEN,
            qualifier.len()
        ))
    })?;
    let chunk_size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let sequence = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    Ok((chunk_size, sequence))
}

/// Raw key-value entry as scanned from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub row: Bytes,
    pub family: Bytes,
    pub qualifier: Bytes,
    pub visibility: String,
    pub value: Bytes,
}

/// One chunk of a document under one access label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub document_id: Bytes,
    /// Size of every chunk of the document except possibly the last
    pub chunk_size: u32,
    /// Zero-based position of the chunk
    pub sequence: u32,
    pub label: String,
    /// Empty for the terminal record
    pub payload: Bytes,
}

impl ChunkRecord {
    pub fn new(
        document_id: impl Into<Bytes>,
        chunk_size: u32,
        sequence: u32,
        label: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            chunk_size,
            sequence,
            label: label.into(),
            payload: payload.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn qualifier(&self) -> [u8; QUALIFIER_LEN] {
        encode_chunk_qualifier(self.chunk_size, self.sequence)
    }
}

/// Any non-chunk column of a document row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRecord {
    pub document_id: Bytes,
    pub family: Bytes,
    pub qualifier: Bytes,
    pub label: String,
    pub value: Bytes,
}

impl ColumnRecord {
    pub fn new(
        document_id: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        label: impl Into<String>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            label: label.into(),
            value: value.into(),
        }
    }

    /// Split a `<ref-id>\0<attribute>` qualifier into its two halves.
    pub fn ref_attribute(&self) -> Option<(&[u8], &[u8])> {
        let split = self.qualifier.iter().position(|&b| b == 0)?;
        Some((&self.qualifier[..split], &self.qualifier[split + 1..]))
    }
}

/// A typed entry of a document row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Chunk(ChunkRecord),
    Column(ColumnRecord),
}

impl Record {
    pub fn document_id(&self) -> &[u8] {
        match self {
            Record::Chunk(chunk) => &chunk.document_id,
            Record::Column(column) => &column.document_id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Record::Chunk(chunk) => &chunk.label,
            Record::Column(column) => &column.label,
        }
    }

    pub fn as_chunk(&self) -> Option<&ChunkRecord> {
        match self {
            Record::Chunk(chunk) => Some(chunk),
            Record::Column(_) => None,
        }
    }

    pub fn is_chunk(&self) -> bool {
        matches!(self, Record::Chunk(_))
    }

    /// Interpret a scanned entry. Entries in the chunk family must carry a
    /// well-formed chunk qualifier.
    pub fn from_entry(entry: StoredEntry) -> Result<Self> {
        if entry.family.as_ref() == CHUNK_CF {
            let (chunk_size, sequence) = decode_chunk_qualifier(&entry.qualifier)?;
            Ok(Record::Chunk(ChunkRecord {
                document_id: entry.row,
                chunk_size,
                sequence,
                label: entry.visibility,
                payload: entry.value,
            }))
        } else {
            Ok(Record::Column(ColumnRecord {
                document_id: entry.row,
                family: entry.family,
                qualifier: entry.qualifier,
                label: entry.visibility,
                value: entry.value,
            }))
        }
    }

    pub fn into_entry(self) -> StoredEntry {
        match self {
            Record::Chunk(chunk) => StoredEntry {
                qualifier: Bytes::copy_from_slice(&chunk.qualifier()),
                row: chunk.document_id,
                family: Bytes::from_static(CHUNK_CF),
                visibility: chunk.label,
                value: chunk.payload,
            },
            Record::Column(column) => StoredEntry {
                row: column.document_id,
                family: column.family,
                qualifier: column.qualifier,
                visibility: column.label,
                value: column.value,
            },
        }
    }
}

impl From<ChunkRecord> for Record {
    fn from(chunk: ChunkRecord) -> Self {
        Record::Chunk(chunk)
    }
}

impl From<ColumnRecord> for Record {
    fn from(column: ColumnRecord) -> Self {
        Record::Column(column)
    }
}
