//! Document-by-document reader over a mixed table scan
//!
//! A scan of the document table yields, per row, the `refs` columns first
//! and then the `~chunk` group. [`DocumentReader`] splits the scan into
//! documents: the leading columns become the [`DocumentHeader`], and the
//! chunk group is exposed as a [`ChunkDecoder`] stream.

use crate::chunked::cursor::ChunkSource;
use crate::chunked::decoder::{ChunkDecoder, ReadOutcome};
use crate::chunked::key::{ColumnRecord, Record};
use crate::common::{display_id, Result};
use bytes::Bytes;
use std::io::Write;

/// Everything stored in front of a document's chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub document_id: Bytes,
    pub refs: Vec<ColumnRecord>,
    /// Whether a chunk group follows; false for rows holding only columns
    pub has_content: bool,
}

impl DocumentHeader {
    /// Value of the first `<ref-id>\0<name>` column
    pub fn attribute(&self, name: &str) -> Option<&[u8]> {
        self.refs
            .iter()
            .find(|column| {
                column
                    .ref_attribute()
                    .is_some_and(|(_, attr)| attr == name.as_bytes())
            })
            .map(|column| column.value.as_ref())
    }
}

/// Outcome of copying one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSummary {
    pub bytes: u64,
    pub labels: Vec<String>,
}

/// Totals from [`DocumentReader::for_each`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub documents: u64,
    pub corrupt: u64,
    pub bytes: u64,
}

pub struct DocumentReader<S> {
    decoder: ChunkDecoder<S>,
    current_has_content: bool,
    documents_read: u64,
}

impl<S: ChunkSource> DocumentReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            decoder: ChunkDecoder::new(source),
            current_has_content: false,
            documents_read: 0,
        }
    }

    /// Advance to the next document.
    ///
    /// The previous document's stream must have been closed. When the first
    /// chunk is already malformed the error is returned here and the stream
    /// still has to be closed before moving on.
    pub fn next_document(&mut self) -> Result<Option<DocumentHeader>> {
        self.decoder.ensure_detached()?;
        self.current_has_content = false;

        let source = self.decoder.get_mut();
        let document_id = match source.peek() {
            Some(record) => Bytes::copy_from_slice(record.document_id()),
            None => return Ok(None),
        };

        let mut refs = Vec::new();
        let has_content = loop {
            let next = source
                .peek()
                .map(|r| (r.document_id() == document_id.as_ref(), r.is_chunk()));
            match next {
                Some((true, false)) => {
                    if let Some(Record::Column(column)) = source.next_record() {
                        refs.push(column);
                    }
                }
                Some((true, true)) => break true,
                _ => break false,
            }
        };

        self.documents_read += 1;
        tracing::debug!(
            "document {} with {} refs (content: {})",
            display_id(&document_id),
            refs.len(),
            has_content
        );

        if has_content {
            self.decoder.attach()?;
            self.current_has_content = true;
        }

        Ok(Some(DocumentHeader {
            document_id,
            refs,
            has_content,
        }))
    }

    /// Stream over the current document's content
    pub fn stream(&mut self) -> &mut ChunkDecoder<S> {
        &mut self.decoder
    }

    /// Copy the current document into `out` and close its stream.
    ///
    /// The first failure wins: a read error is reported even if closing
    /// also fails.
    pub fn copy_to<W: Write>(
        &mut self,
        out: &mut W,
        buffer_size: usize,
    ) -> Result<DocumentSummary> {
        let mut buf = vec![0u8; buffer_size.max(1)];
        let mut bytes = 0u64;

        let copied = loop {
            match self.decoder.read(&mut buf) {
                Ok(ReadOutcome::Bytes(n)) => {
                    if let Err(e) = out.write_all(&buf[..n]) {
                        break Err(e.into());
                    }
                    bytes += n as u64;
                }
                Ok(ReadOutcome::EndOfStream) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let closed = self.decoder.close();
        copied?;
        closed?;

        let labels = if self.current_has_content {
            self.decoder.access_labels().to_vec()
        } else {
            Vec::new()
        };
        Ok(DocumentSummary { bytes, labels })
    }

    /// Decode every remaining document and hand each complete one to `visit`.
    ///
    /// A document is buffered in full and only reaches `visit` once its
    /// stream closed cleanly. Corrupt documents are logged and skipped
    /// unless `fail_fast` is set, in which case the first one stops the
    /// scan. Errors from `visit` stop the scan as well.
    pub fn for_each<F>(
        &mut self,
        buffer_size: usize,
        fail_fast: bool,
        mut visit: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(&DocumentHeader, &[u8], &DocumentSummary) -> Result<()>,
    {
        let mut report = ScanReport::default();
        let mut content = Vec::new();
        loop {
            content.clear();
            let (document, e) = match self.next_document() {
                Ok(Some(header)) => match self.copy_to(&mut content, buffer_size) {
                    Ok(summary) => {
                        visit(&header, &content, &summary)?;
                        report.documents += 1;
                        report.bytes += summary.bytes;
                        continue;
                    }
                    Err(e) => (display_id(&header.document_id), e),
                },
                Ok(None) => break,
                Err(e) => {
                    let document = self
                        .decoder
                        .document_id()
                        .map(display_id)
                        .unwrap_or_default();
                    if e.is_data_integrity() {
                        // the fault is already in hand; closing only detaches
                        let _ = self.decoder.close();
                    }
                    (document, e)
                }
            };

            if e.is_data_integrity() && !fail_fast {
                tracing::warn!("Skipping corrupt document {}: {}", document, e);
                report.corrupt += 1;
            } else {
                tracing::error!("Stopping at document {}: {}", document, e);
                return Err(e);
            }
        }
        Ok(report)
    }

    pub fn documents_read(&self) -> u64 {
        self.documents_read
    }

    pub fn into_inner(self) -> S {
        self.decoder.into_inner()
    }
}
