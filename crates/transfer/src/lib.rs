//! Byte sources, deterministic chunk splitting and content hashing.
//!
//! These are the local primitives the upload coordinator builds on; nothing
//! in this crate touches the network.

mod hashing;
mod progress;
mod source;
mod splitter;
mod validation;

pub use hashing::{UploadDescriptor, crc32_hex, md5_hex, slice_md5_hex};
pub use progress::SpeedCalculator;
pub use source::{ByteSource, FileSource, MemorySource, StreamSource};
pub use splitter::{Chunk, ChunkSpan, ChunkSplitter, read_chunk};
pub use validation::{validate_remote_path, validate_remote_path_shape};

/// Default chunk size: 4 MiB.
///
/// Far below the server's 2 GiB part limit; keeps per-chunk retries cheap.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source is not seekable: requested offset {requested}, stream is at {position}")]
    NotSeekable { requested: u64, position: u64 },

    #[error("span {offset}+{len} is outside a source of {size} bytes")]
    SpanOutOfRange { offset: u64, len: u64, size: u64 },

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u64),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("read interrupted at offset {offset}")]
    Interrupted { offset: u64 },
}
