//! Chunked document storage: key layout, record cursor, and the decoder
//! that turns a chunk group back into the original bytes

pub mod cursor;
pub mod decoder;
pub mod dump;
pub mod key;
pub mod reader;

pub use cursor::{ChunkSource, Cursor};
pub use decoder::{ChunkDecoder, DecoderState, ReadOutcome};
pub use dump::{load_dump, read_dump, write_dump, DumpLine};
pub use key::{
    decode_chunk_qualifier, encode_chunk_qualifier, ChunkRecord, ColumnRecord, Record,
    StoredEntry, CHUNK_CF, REFS_CF,
};
pub use reader::{DocumentHeader, DocumentReader, DocumentSummary, ScanReport};
