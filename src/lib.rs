//! # filedata
//!
//! Reassembles documents that were stored in a sorted key-value table as
//! fixed-size chunks, one copy per access label:
//! - Validates that chunk sequence numbers are contiguous and the chunk size
//!   constant
//! - Coalesces duplicate chunks stored under different labels
//! - Reports every label a document was stored under
//! - Reads into buffers of any size, independent of chunk boundaries
//!
//! ## Architecture
//!
//! ```text
//!   table scan (sorted by row, family, qualifier, label)
//!        │
//! ┌──────▼──────────┐   refs columns    ┌────────────────┐
//! │ DocumentReader  ├──────────────────▶│ DocumentHeader │
//! └──────┬──────────┘                   └────────────────┘
//!        │ ~chunk group
//! ┌──────▼──────────┐   bytes           ┌────────────────┐
//! │  ChunkDecoder   ├──────────────────▶│  io::Read /    │
//! │  (one document) │   labels          │  read(buf)     │
//! └─────────────────┘                   └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use filedata::chunked::{ChunkDecoder, ChunkRecord, Cursor, ReadOutcome};
//!
//! let mut decoder = ChunkDecoder::new(Cursor::from_chunks(vec![
//!     ChunkRecord::new("b", 100, 0, "A&B", "qwertyuiop"),
//!     ChunkRecord::new("b", 100, 0, "B&C", "qwertyuiop"),
//!     ChunkRecord::new("b", 100, 1, "A&B", ""),
//! ]));
//!
//! decoder.attach()?;
//! let mut buf = [0u8; 5];
//! assert_eq!(decoder.read(&mut buf)?, ReadOutcome::Bytes(5));
//! assert_eq!(&buf, b"qwert");
//! assert_eq!(decoder.read(&mut buf)?, ReadOutcome::Bytes(5));
//! assert_eq!(decoder.read(&mut buf)?, ReadOutcome::EndOfStream);
//! decoder.close()?;
//! assert_eq!(decoder.access_labels(), ["A&B", "B&C"]);
//! # Ok::<(), filedata::Error>(())
//! ```
//!
//! ### CLI
//! ```bash
//! filedata --dump table.jsonl cat --document b
//! filedata --dump table.jsonl extract --output ./documents
//! filedata --dump table.jsonl labels
//! ```

pub mod chunked;
pub mod common;

// Re-export commonly used types
pub use chunked::{ChunkDecoder, ChunkRecord, Cursor, DocumentReader, ReadOutcome};
pub use common::{Config, Error, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
