use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::TransferError;
use crate::splitter::ChunkSpan;

/// A finite sequence of bytes read by the upload coordinator.
///
/// The caller owns the source; the coordinator only reads from it.
/// Seekable sources can serve any span any number of times, which is what
/// makes rapid-upload hashing and per-chunk retry possible. Sequential
/// sources serve each span once, strictly in order.
pub trait ByteSource: Send {
    /// Total length in bytes.
    fn size(&self) -> u64;

    /// Returns `true` if spans can be re-read out of order.
    fn is_seekable(&self) -> bool;

    /// Reads exactly the bytes covered by `span`.
    fn read_span(&mut self, span: &ChunkSpan) -> Result<Vec<u8>, TransferError>;
}

fn check_bounds(span: &ChunkSpan, size: u64) -> Result<(), TransferError> {
    if span.end() > size {
        return Err(TransferError::SpanOutOfRange {
            offset: span.offset,
            len: span.len,
            size,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// In-memory source.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn read_span(&mut self, span: &ChunkSpan) -> Result<Vec<u8>, TransferError> {
        check_bounds(span, self.size())?;
        let start = span.offset as usize;
        let end = span.end() as usize;
        Ok(self.data[start..end].to_vec())
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// Local file read with positioned reads.
pub struct FileSource {
    file: std::fs::File,
    size: u64,
}

impl FileSource {
    /// Opens `path` for reading. The size is fixed at open time.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn read_span(&mut self, span: &ChunkSpan) -> Result<Vec<u8>, TransferError> {
        check_bounds(span, self.size)?;
        self.file.seek(SeekFrom::Start(span.offset))?;
        let mut buf = vec![0u8; span.len as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// StreamSource
// ---------------------------------------------------------------------------

/// Sequential source over any reader whose total length is known up front
/// (a pipe, a socket, a decompressor).
pub struct StreamSource<R> {
    reader: R,
    size: u64,
    position: u64,
}

impl<R: Read + Send> StreamSource<R> {
    pub fn new(reader: R, size: u64) -> Self {
        Self {
            reader,
            size,
            position: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read + Send> ByteSource for StreamSource<R> {
    fn size(&self) -> u64 {
        self.size
    }

    fn is_seekable(&self) -> bool {
        false
    }

    fn read_span(&mut self, span: &ChunkSpan) -> Result<Vec<u8>, TransferError> {
        check_bounds(span, self.size)?;
        if span.offset != self.position {
            return Err(TransferError::NotSeekable {
                requested: span.offset,
                position: self.position,
            });
        }
        let mut buf = vec![0u8; span.len as usize];
        self.reader.read_exact(&mut buf)?;
        self.position += span.len;
        Ok(buf)
    }
}
