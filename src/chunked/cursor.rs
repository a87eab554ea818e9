//! Peekable record cursor shared across documents

use crate::chunked::key::{ChunkRecord, Record};
use std::iter::Peekable;

/// Forward-only source of sorted records.
///
/// The decoder needs to look at the next record's document id before it
/// decides whether to consume it, so a plain `Iterator` is not enough.
pub trait ChunkSource {
    /// Next record, without consuming it
    fn peek(&mut self) -> Option<&Record>;

    /// Consume the next record
    fn next_record(&mut self) -> Option<Record>;

    fn is_exhausted(&mut self) -> bool {
        self.peek().is_none()
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn peek(&mut self) -> Option<&Record> {
        (**self).peek()
    }

    fn next_record(&mut self) -> Option<Record> {
        (**self).next_record()
    }
}

/// `ChunkSource` over any record iterator
#[derive(Debug)]
pub struct Cursor<I: Iterator<Item = Record>> {
    inner: Peekable<I>,
    consumed: u64,
}

impl<I: Iterator<Item = Record>> Cursor<I> {
    pub fn new<T>(records: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            inner: records.into_iter().peekable(),
            consumed: 0,
        }
    }

    /// Number of records consumed so far
    pub fn position(&self) -> u64 {
        self.consumed
    }
}

impl<C: Iterator<Item = ChunkRecord>> Cursor<std::iter::Map<C, fn(ChunkRecord) -> Record>> {
    /// Cursor over an already-filtered chunk stream
    pub fn from_chunks<T>(chunks: T) -> Self
    where
        T: IntoIterator<IntoIter = C>,
    {
        Cursor::new(chunks.into_iter().map(Record::Chunk as fn(ChunkRecord) -> Record))
    }
}

impl<I: Iterator<Item = Record>> ChunkSource for Cursor<I> {
    fn peek(&mut self) -> Option<&Record> {
        self.inner.peek()
    }

    fn next_record(&mut self) -> Option<Record> {
        let record = self.inner.next()?;
        self.consumed += 1;
        Some(record)
    }
}

impl<I: Iterator<Item = Record>> Iterator for Cursor<I> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.next_record()
    }
}
