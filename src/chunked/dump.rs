//! JSON-lines export of a document table
//!
//! One entry per line, in scan order:
//!
//! ```text
//! {"row":"b","family":"~chunk","qualifier":"0000006400000000","visibility":"A&B","value":"7177657274"}
//! ```
//!
//! `qualifier` and `value` are hex encoded since both are binary.

use crate::chunked::key::{Record, StoredEntry};
use crate::common::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpLine {
    pub row: String,
    pub family: String,
    #[serde(with = "hex::serde")]
    pub qualifier: Vec<u8>,
    #[serde(default)]
    pub visibility: String,
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

impl From<DumpLine> for StoredEntry {
    fn from(line: DumpLine) -> Self {
        StoredEntry {
            row: Bytes::from(line.row),
            family: Bytes::from(line.family),
            qualifier: Bytes::from(line.qualifier),
            visibility: line.visibility,
            value: Bytes::from(line.value),
        }
    }
}

impl From<StoredEntry> for DumpLine {
    fn from(entry: StoredEntry) -> Self {
        DumpLine {
            row: String::from_utf8_lossy(&entry.row).into_owned(),
            family: String::from_utf8_lossy(&entry.family).into_owned(),
            qualifier: entry.qualifier.to_vec(),
            visibility: entry.visibility,
            value: entry.value.to_vec(),
        }
    }
}

/// Parse a dump. Blank lines are ignored.
pub fn read_dump<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: DumpLine = serde_json::from_str(&line).inspect_err(|e| {
            tracing::warn!("bad dump line {}: {}", index + 1, e);
        })?;
        records.push(Record::from_entry(parsed.into())?);
    }
    Ok(records)
}

pub fn load_dump(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    read_dump(BufReader::new(file))
}

pub fn write_dump<W, I>(records: I, out: &mut W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = Record>,
{
    for record in records {
        let line = DumpLine::from(record.into_entry());
        serde_json::to_writer(&mut *out, &line)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
