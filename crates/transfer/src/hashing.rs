use md5::{Digest, Md5};
use pcs_protocol::constants::RAPID_SLICE_SIZE;
use tracing::debug;

use crate::TransferError;
use crate::source::ByteSource;
use crate::splitter::ChunkSplitter;

/// Block size used when streaming a source through the hashers.
const HASH_BLOCK_SIZE: u64 = 1024 * 1024;

/// Hex-encoded MD5 of `data`.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// CRC32 of `data` as lowercase hex without zero padding, the form the
/// rapid-upload endpoint expects.
pub fn crc32_hex(data: &[u8]) -> String {
    format!("{:x}", crc32fast::hash(data))
}

/// Hex-encoded MD5 of the first 256 KiB of `data` (all of it if shorter).
pub fn slice_md5_hex(data: &[u8]) -> String {
    md5_hex(&data[..data.len().min(RAPID_SLICE_SIZE)])
}

/// Identity of a whole source, as required by rapid upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    pub size: u64,
    /// MD5 of the full content.
    pub content_md5: String,
    /// CRC32 of the full content.
    pub content_crc32: String,
    /// MD5 of the leading 256 KiB.
    pub slice_md5: String,
}

impl UploadDescriptor {
    /// Computes the descriptor of an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            content_md5: md5_hex(data),
            content_crc32: crc32_hex(data),
            slice_md5: slice_md5_hex(data),
        }
    }

    /// Streams `source` once through all three hashers.
    ///
    /// The source must be seekable: the coordinator reads it again for the
    /// chunked path after hashing.
    pub fn compute(source: &mut dyn ByteSource) -> Result<Self, TransferError> {
        Self::compute_with(source, || false)
    }

    /// Like [`compute`](Self::compute), polling `should_stop` before every
    /// block read. Stopping yields [`TransferError::Interrupted`].
    pub fn compute_with(
        source: &mut dyn ByteSource,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<Self, TransferError> {
        let size = source.size();
        let mut content = Md5::new();
        let mut slice = Md5::new();
        let mut crc = crc32fast::Hasher::new();
        let mut sliced = 0usize;

        for span in ChunkSplitter::new(size, HASH_BLOCK_SIZE)? {
            if should_stop() {
                return Err(TransferError::Interrupted {
                    offset: span.offset,
                });
            }
            let block = source.read_span(&span)?;
            content.update(&block);
            crc.update(&block);
            if sliced < RAPID_SLICE_SIZE {
                let take = (RAPID_SLICE_SIZE - sliced).min(block.len());
                slice.update(&block[..take]);
                sliced += take;
            }
        }

        let descriptor = Self {
            size,
            content_md5: hex::encode(content.finalize()),
            content_crc32: format!("{:x}", crc.finalize()),
            slice_md5: hex::encode(slice.finalize()),
        };
        debug!(size, md5 = %descriptor.content_md5, "computed upload descriptor");
        Ok(descriptor)
    }
}
