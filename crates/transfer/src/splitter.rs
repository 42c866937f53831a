use pcs_protocol::constants::MAX_PART_SIZE;

use crate::TransferError;
use crate::source::ByteSource;

/// Byte range of one chunk within a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Zero-based position of the chunk in the source.
    pub index: usize,
    /// Byte offset of the first byte.
    pub offset: u64,
    /// Length in bytes.
    pub len: u64,
}

impl ChunkSpan {
    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// A chunk held in memory for the duration of one upload call.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub offset: u64,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads the chunk described by `span` from `source`.
pub fn read_chunk(source: &mut dyn ByteSource, span: &ChunkSpan) -> Result<Chunk, TransferError> {
    let data = source.read_span(span)?;
    Ok(Chunk {
        index: span.index,
        offset: span.offset,
        data,
    })
}

/// Cuts a source of known length into fixed-size spans.
///
/// Boundaries depend only on `(total_size, max_chunk_size)`: every span but
/// the last is exactly `max_chunk_size` long, and [`restart`](Self::restart)
/// (or a clone) replays the same sequence.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    total_size: u64,
    max_chunk_size: u64,
    next_index: usize,
}

impl ChunkSplitter {
    /// Creates a splitter. `max_chunk_size` must be in `1..=MAX_PART_SIZE`.
    pub fn new(total_size: u64, max_chunk_size: u64) -> Result<Self, TransferError> {
        if max_chunk_size == 0 || max_chunk_size > MAX_PART_SIZE {
            return Err(TransferError::InvalidChunkSize(max_chunk_size));
        }
        Ok(Self {
            total_size,
            max_chunk_size,
            next_index: 0,
        })
    }

    /// Number of spans the full sequence yields: `ceil(total / max)`.
    pub fn chunk_count(&self) -> usize {
        self.total_size.div_ceil(self.max_chunk_size) as usize
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    /// Rewinds to the first span.
    pub fn restart(&mut self) {
        self.next_index = 0;
    }

    /// Span at `index`, if the source has one.
    pub fn span_at(&self, index: usize) -> Option<ChunkSpan> {
        let offset = (index as u64).checked_mul(self.max_chunk_size)?;
        if offset >= self.total_size {
            return None;
        }
        Some(ChunkSpan {
            index,
            offset,
            len: self.max_chunk_size.min(self.total_size - offset),
        })
    }
}

impl Iterator for ChunkSplitter {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<ChunkSpan> {
        let span = self.span_at(self.next_index)?;
        self.next_index += 1;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chunk_count().saturating_sub(self.next_index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkSplitter {}
