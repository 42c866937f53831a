//! Upload configuration, requests, events and results.

use std::time::Duration;

use pcs_protocol::constants::MAX_PART_SIZE;
use pcs_protocol::{OnDuplicate, RemoteFile};
use pcs_transfer::DEFAULT_CHUNK_SIZE;

use crate::error::UploadError;
use crate::retry::RetryPolicy;

/// Coordinator knobs.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum chunk size in bytes.
    pub chunk_size: u64,
    /// Maximum number of chunk uploads in flight.
    pub concurrency: usize,
    /// Try rapid upload before sending any bytes.
    pub rapid_upload: bool,
    /// Send one-chunk sources with a single upload call instead of failing
    /// with [`UploadError::TooSmallForChunking`].
    pub allow_single_upload: bool,
    /// Per-call retry budget for transient failures.
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 4,
            rapid_upload: true,
            allow_single_upload: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_PART_SIZE {
            return Err(UploadError::InvalidConfig(format!(
                "chunk_size must be in 1..={MAX_PART_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.concurrency == 0 {
            return Err(UploadError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(UploadError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.backoff_factor.is_nan() || self.retry.backoff_factor < 1.0 {
            return Err(UploadError::InvalidConfig(format!(
                "retry.backoff_factor must be >= 1.0, got {}",
                self.retry.backoff_factor
            )));
        }
        Ok(())
    }
}

/// What to upload where.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub remote_path: String,
    pub on_duplicate: OnDuplicate,
}

impl UploadRequest {
    pub fn new(remote_path: impl Into<String>, on_duplicate: OnDuplicate) -> Self {
        Self {
            remote_path: remote_path.into(),
            on_duplicate,
        }
    }
}

/// Progress events emitted during an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Computing the rapid-upload descriptor.
    Hashing { remote_path: String, size: u64 },
    /// The server already held the content.
    RapidHit { remote_path: String },
    /// No matching content on the server; sending the bytes.
    RapidMiss { remote_path: String },
    /// A chunk was stored as a part.
    ChunkUploaded {
        index: usize,
        total: usize,
        bytes_done: u64,
        bytes_total: u64,
    },
    /// A chunk upload failed transiently and will be retried.
    ChunkRetry {
        index: usize,
        /// Number of the attempt about to start.
        attempt: u32,
        delay: Duration,
    },
    /// All parts are stored; assembling the file.
    Committing { parts: usize },
    Completed { remote_path: String },
}

/// How the file reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    /// Registered by content identity; no bytes sent.
    Rapid,
    /// Uploaded as `parts` chunks and committed.
    Chunked { parts: usize },
    /// Uploaded with one direct call.
    Single,
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file: RemoteFile,
    pub method: UploadMethod,
    /// Payload bytes sent, excluding retries.
    pub bytes_sent: u64,
}
