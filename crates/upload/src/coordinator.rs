//! Upload coordinator.
//!
//! Picks the upload path for a source (rapid, single call or chunked),
//! emits progress events, and supports cancellation up to the commit.

use std::sync::Arc;

use pcs_protocol::constants::MAX_PARTS;
use pcs_protocol::{OnDuplicate, RemoteFile};
use pcs_transfer::{ByteSource, ChunkSplitter, validate_remote_path_shape};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::UploadError;
use crate::retry::{self, RetryFailure, RetryPolicy};
use crate::transport::UploadTransport;
use crate::types::{UploadConfig, UploadEvent, UploadMethod, UploadOutcome, UploadRequest};

/// Drives uploads through an injected [`UploadTransport`].
pub struct UploadCoordinator {
    transport: Arc<dyn UploadTransport>,
    config: UploadConfig,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl UploadCoordinator {
    /// Creates a coordinator.
    pub fn new(transport: Arc<dyn UploadTransport>, config: UploadConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            transport,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are dropped when the receiver lags; uploads never block on it.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token shared by every upload of this
    /// coordinator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `source` to `request.remote_path`.
    ///
    /// The pipeline:
    /// 1. Reject bad configuration and empty paths
    /// 2. Rapid attempt (seekable sources of at least 256 KiB)
    /// 3. Single call for one-chunk sources, chunked upload otherwise
    /// 4. Commit the parts in source order
    pub async fn upload(
        &self,
        request: &UploadRequest,
        source: &mut dyn ByteSource,
    ) -> Result<UploadOutcome, UploadError> {
        let session = UploadSession {
            transport: self.transport.as_ref(),
            config: &self.config,
            cancel: &self.cancel,
            events_tx: &self.events_tx,
            remote_path: &request.remote_path,
            on_duplicate: request.on_duplicate,
        };

        match session.run(source).await {
            Ok(outcome) => {
                session.emit(UploadEvent::Completed {
                    remote_path: outcome.file.path.clone(),
                });
                info!(
                    remote_path = %request.remote_path,
                    method = ?outcome.method,
                    bytes_sent = outcome.bytes_sent,
                    "upload completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(remote_path = %request.remote_path, error = %e, "upload failed");
                Err(e)
            }
        }
    }
}

/// Runs blocking source I/O.
///
/// Sources are borrowed from the caller, so the work cannot move to
/// `spawn_blocking`; on a multi-threaded runtime it runs under
/// `block_in_place` instead, inline otherwise.
pub(crate) fn blocking_io<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// State of one upload call.
pub(crate) struct UploadSession<'a> {
    pub(crate) transport: &'a dyn UploadTransport,
    pub(crate) config: &'a UploadConfig,
    pub(crate) cancel: &'a CancellationToken,
    pub(crate) events_tx: &'a mpsc::Sender<UploadEvent>,
    pub(crate) remote_path: &'a str,
    pub(crate) on_duplicate: OnDuplicate,
}

impl UploadSession<'_> {
    async fn run(&self, source: &mut dyn ByteSource) -> Result<UploadOutcome, UploadError> {
        self.config.validate()?;
        validate_remote_path_shape(self.remote_path)
            .map_err(|e| UploadError::InvalidPath(e.to_string()))?;
        self.check_cancelled()?;

        let size = source.size();
        let splitter = ChunkSplitter::new(size, self.config.chunk_size)
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?;

        if let Some(file) = self.try_rapid(source).await? {
            return Ok(UploadOutcome {
                file,
                method: UploadMethod::Rapid,
                bytes_sent: 0,
            });
        }

        let parts = splitter.chunk_count();
        if parts <= 1 {
            if !self.config.allow_single_upload {
                return Err(UploadError::TooSmallForChunking {
                    size,
                    max_chunk_size: self.config.chunk_size,
                });
            }
            debug!(remote_path = %self.remote_path, size, "source fits in one chunk, uploading directly");
            let file = self.upload_single(source).await?;
            return Ok(UploadOutcome {
                file,
                method: UploadMethod::Single,
                bytes_sent: size,
            });
        }

        if parts > MAX_PARTS {
            return Err(UploadError::TooManyParts { parts });
        }

        let file = self.upload_chunked(splitter, source).await?;
        Ok(UploadOutcome {
            file,
            method: UploadMethod::Chunked { parts },
            bytes_sent: size,
        })
    }

    /// Sends an event without waiting for channel capacity.
    pub(crate) fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.try_send(event);
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }

    /// Retry policy for calls that are unsafe to repeat unless the existing
    /// file is being replaced anyway.
    pub(crate) fn non_idempotent_policy(&self) -> RetryPolicy {
        if self.on_duplicate == OnDuplicate::Overwrite {
            self.config.retry.clone()
        } else {
            RetryPolicy::none()
        }
    }

    /// Uploads a source of at most one chunk with a single call.
    async fn upload_single(&self, source: &mut dyn ByteSource) -> Result<RemoteFile, UploadError> {
        let splitter = ChunkSplitter::new(source.size(), self.config.chunk_size)
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?;
        let data = match splitter.span_at(0) {
            Some(span) => blocking_io(|| source.read_span(&span)).map_err(|e| {
                UploadError::SourceUnreadable {
                    chunk_index: Some(0),
                    source: e,
                }
            })?,
            None => Vec::new(),
        };
        self.check_cancelled()?;

        let policy = self.non_idempotent_policy();
        retry::run(
            &policy,
            self.cancel,
            |_, _| {},
            || self.transport.upload_file(self.remote_path, &data, self.on_duplicate),
        )
        .await
        .map_err(|failure| self.map_failure(failure, None))
    }

    pub(crate) fn map_failure(
        &self,
        failure: RetryFailure,
        chunk_index: Option<usize>,
    ) -> UploadError {
        match failure {
            RetryFailure::Cancelled => UploadError::Cancelled,
            RetryFailure::Failed { error, attempts } => {
                UploadError::from_transport(error, self.remote_path, chunk_index, attempts)
            }
        }
    }
}
