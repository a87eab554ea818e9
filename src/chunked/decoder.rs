//! Reassembles a document from its chunk records
//!
//! A document is stored as a run of records sorted by
//! `(chunk_size, sequence, label)`. Every chunk may be stored several times,
//! once per access label, with identical bytes. The decoder walks that run,
//! checks that sequence numbers are contiguous and that the chunk size never
//! changes, hands out the payload of the first copy of each chunk and
//! remembers every label it saw.
//!
//! ```text
//!   attach()          read()                          close()
//! UNATTACHED ──▶ OPEN ⇄ (drain pending / pull chunk) ──▶ ENDED ──▶ UNATTACHED
//!                  │                                              ▲
//!                  └──── malformed sequence ──▶ FAULTED ──────────┘
//! ```

use crate::chunked::cursor::ChunkSource;
use crate::chunked::key::Record;
use crate::common::{display_id, Error, Result, SequenceFault};
use bytes::{Buf, Bytes};
use std::collections::HashSet;
use std::io;

/// Result of a single read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes copied into the caller's buffer (0 only for an empty buffer)
    Bytes(usize),
    /// No bytes left and none will come for this document
    EndOfStream,
}

impl ReadOutcome {
    pub fn bytes_read(self) -> usize {
        match self {
            ReadOutcome::Bytes(n) => n,
            ReadOutcome::EndOfStream => 0,
        }
    }

    pub fn is_end(self) -> bool {
        matches!(self, ReadOutcome::EndOfStream)
    }
}

/// Lifecycle of the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderState {
    Unattached,
    /// Attached, with bytes pending or more chunks to pull
    Open,
    /// The document's chunk group has been fully consumed
    Ended,
    /// A malformed sequence was seen; only `close` may follow
    Faulted(SequenceFault),
}

/// Insertion-ordered set of labels
#[derive(Debug, Default)]
struct LabelSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl LabelSet {
    fn insert(&mut self, label: &str) {
        if !self.seen.contains(label) {
            self.seen.insert(label.to_string());
            self.order.push(label.to_string());
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

/// Decode state for the document currently attached
#[derive(Debug)]
struct Session {
    document_id: Bytes,
    chunk_size: u32,
    sequence: u32,
    pending: Bytes,
    terminated: bool,
}

/// Byte stream over one document's chunk group at a time.
///
/// The decoder owns its source, like a buffered reader owns its inner
/// reader. Pass `&mut cursor` to keep using the cursor after the decoder is
/// dropped. After [`close`](Self::close) the source is positioned at the
/// first record of the next document, ready for the next [`attach`](Self::attach).
pub struct ChunkDecoder<S> {
    source: S,
    state: DecoderState,
    session: Option<Session>,
    labels: LabelSet,
}

impl<S: ChunkSource> ChunkDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: DecoderState::Unattached,
            session: None,
            labels: LabelSet::default(),
        }
    }

    /// Start decoding the next document from the source.
    ///
    /// Non-chunk columns in front of the first chunk are skipped. An
    /// exhausted source gives an empty stream. Fails with `AlreadyAttached`
    /// while a previous document has not been closed, leaving it untouched.
    pub fn attach(&mut self) -> Result<()> {
        self.ensure_detached()?;

        self.labels.clear();
        self.session = None;

        let first = loop {
            match self.source.next_record() {
                Some(Record::Chunk(chunk)) => break chunk,
                Some(Record::Column(column)) => {
                    tracing::debug!(
                        "skipping non-chunk column of {}",
                        display_id(&column.document_id)
                    );
                }
                None => {
                    tracing::debug!("source has no chunks");
                    self.state = DecoderState::Ended;
                    return Ok(());
                }
            }
        };

        tracing::debug!(
            "starting chunk {} of {} (chunk size {})",
            first.sequence,
            display_id(&first.document_id),
            first.chunk_size
        );
        self.labels.insert(&first.label);
        let sequence = first.sequence;
        let terminated = first.is_terminal();
        self.session = Some(Session {
            document_id: first.document_id,
            chunk_size: first.chunk_size,
            sequence,
            terminated,
            pending: first.payload,
        });
        self.state = DecoderState::Open;

        if sequence != 0 {
            return Err(self.fault(SequenceFault::NonZeroStart { found: sequence }));
        }
        Ok(())
    }

    /// Copy as many bytes as are available into `buf`.
    ///
    /// Chunk boundaries are invisible to the caller. Returns
    /// `EndOfStream` once the document is exhausted; an empty `buf` always
    /// yields `Bytes(0)`. A malformed sequence fails the read that observes
    /// it, and every later read until `close`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if buf.is_empty() {
            return Ok(ReadOutcome::Bytes(0));
        }
        match &self.state {
            DecoderState::Unattached | DecoderState::Ended => return Ok(ReadOutcome::EndOfStream),
            DecoderState::Faulted(fault) => return Err(self.malformed(fault.clone())),
            DecoderState::Open => {}
        }

        let mut total = 0;
        while total < buf.len() {
            let available = self.session.as_ref().map_or(0, |s| s.pending.len());
            if available == 0 {
                if !self.fill()? {
                    break;
                }
                continue;
            }

            let Some(session) = self.session.as_mut() else {
                break;
            };
            let count = available.min(buf.len() - total);
            buf[total..total + count].copy_from_slice(&session.pending[..count]);
            session.pending.advance(count);
            total += count;
        }

        tracing::trace!("filled {} bytes", total);
        if total == 0 {
            Ok(ReadOutcome::EndOfStream)
        } else {
            Ok(ReadOutcome::Bytes(total))
        }
    }

    /// Read a single byte, `None` at end of stream
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            ReadOutcome::Bytes(_) => Ok(Some(byte[0])),
            ReadOutcome::EndOfStream => Ok(None),
        }
    }

    /// Labels seen since the last attach, in first-seen order.
    ///
    /// Callable at any point. After a fault this still returns what was
    /// gathered up to the bad record; diagnostics rely on it.
    pub fn access_labels(&self) -> &[String] {
        &self.labels.order
    }

    /// Finish the current document.
    ///
    /// Unread chunks are still validated. Fails with
    /// `IncompleteChunkSequence` when the group never reached its end
    /// marker, and re-raises `MalformedChunkSequence` after a fault. Either
    /// way the decoder is detached and the source moved past the document.
    pub fn close(&mut self) -> Result<()> {
        let outcome = match &self.state {
            DecoderState::Unattached => return Ok(()),
            DecoderState::Faulted(fault) => Err(self.malformed(fault.clone())),
            DecoderState::Open | DecoderState::Ended => self.finish(),
        };

        self.skip_document();
        self.session = None;
        self.state = DecoderState::Unattached;
        outcome
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state != DecoderState::Unattached
    }

    /// Id of the document being decoded
    pub fn document_id(&self) -> Option<&[u8]> {
        self.session.as_ref().map(|s| s.document_id.as_ref())
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source. Advancing it while attached corrupts
    /// the current document.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Swap in a new source; only allowed while detached.
    pub fn replace_source(&mut self, source: S) -> Result<S> {
        self.ensure_detached()?;
        Ok(std::mem::replace(&mut self.source, source))
    }

    pub(crate) fn ensure_detached(&self) -> Result<()> {
        if self.is_attached() {
            return Err(Error::AlreadyAttached {
                document: self.document_name(),
            });
        }
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Drain and validate whatever is left of the document.
    fn finish(&mut self) -> Result<()> {
        loop {
            if let Some(session) = self.session.as_mut() {
                session.pending.clear();
            }
            if !self.fill()? {
                break;
            }
        }

        match &self.session {
            Some(session) if !session.terminated => Err(Error::IncompleteChunkSequence {
                document: display_id(&session.document_id),
            }),
            _ => Ok(()),
        }
    }

    /// Pull records until a chunk with bytes is pending or the group ends.
    /// Returns false at the end of the group.
    fn fill(&mut self) -> Result<bool> {
        match self.pull() {
            Ok(filled) => Ok(filled),
            Err(fault) => Err(self.fault(fault)),
        }
    }

    fn pull(&mut self) -> std::result::Result<bool, SequenceFault> {
        let Some(session) = self.session.as_mut() else {
            self.state = DecoderState::Ended;
            return Ok(false);
        };

        loop {
            let same_document = self
                .source
                .peek()
                .is_some_and(|r| r.document_id() == session.document_id.as_ref());
            if !same_document {
                if !session.terminated {
                    tracing::debug!(
                        "reached end of {} without end chunk marker",
                        display_id(&session.document_id)
                    );
                }
                self.state = DecoderState::Ended;
                return Ok(false);
            }

            let chunk = match self.source.next_record() {
                Some(Record::Chunk(chunk)) => chunk,
                Some(Record::Column(_)) => {
                    tracing::debug!("skipping non-chunk column");
                    continue;
                }
                None => {
                    self.state = DecoderState::Ended;
                    return Ok(false);
                }
            };

            if chunk.chunk_size != session.chunk_size {
                if session.terminated {
                    // another chunking of the same document
                    tracing::debug!("skipping chunk of size {}", chunk.chunk_size);
                    continue;
                }
                return Err(SequenceFault::ChunkSizeChanged {
                    expected: session.chunk_size,
                    found: chunk.chunk_size,
                });
            }

            // Recorded before the sequence checks on purpose: labels of a
            // corrupt group stay readable after the fault.
            self.labels.insert(&chunk.label);

            if chunk.sequence == session.sequence {
                tracing::debug!("skipping identical chunk with label {}", chunk.label);
                continue;
            }

            if session.terminated {
                return Err(SequenceFault::ChunkAfterEnd {
                    end: session.sequence,
                    found: chunk.sequence,
                });
            }

            if chunk.sequence < session.sequence {
                return Err(SequenceFault::OutOfOrder {
                    current: session.sequence,
                    found: chunk.sequence,
                });
            }

            if session.sequence.checked_add(1) != Some(chunk.sequence) {
                return Err(SequenceFault::MissingChunks {
                    current: session.sequence,
                    found: chunk.sequence,
                });
            }

            session.sequence = chunk.sequence;
            if chunk.is_terminal() {
                tracing::debug!("end marker at chunk {}", chunk.sequence);
                session.terminated = true;
                continue;
            }

            session.pending = chunk.payload;
            return Ok(true);
        }
    }

    fn fault(&mut self, fault: SequenceFault) -> Error {
        tracing::debug!("malformed chunk sequence: {}", fault);
        if let Some(session) = self.session.as_mut() {
            session.pending.clear();
        }
        let err = self.malformed(fault.clone());
        self.state = DecoderState::Faulted(fault);
        err
    }

    fn malformed(&self, fault: SequenceFault) -> Error {
        Error::MalformedChunkSequence {
            document: self.document_name(),
            fault,
        }
    }

    /// Move the source past every remaining record of the current document.
    fn skip_document(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        let mut skipped = 0u64;
        while self
            .source
            .peek()
            .is_some_and(|r| r.document_id() == session.document_id.as_ref())
        {
            self.source.next_record();
            skipped += 1;
        }
        if skipped > 0 {
            tracing::debug!(
                "skipped {} records of {}",
                skipped,
                display_id(&session.document_id)
            );
        }
    }

    fn document_name(&self) -> String {
        self.session
            .as_ref()
            .map(|s| display_id(&s.document_id))
            .unwrap_or_else(|| "<none>".to_string())
    }
}

impl<S: ChunkSource> io::Read for ChunkDecoder<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChunkDecoder::read(self, buf)?.bytes_read())
    }
}
