//! Chunked upload: bounded-concurrency part uploads followed by one commit.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use pcs_protocol::{PartHash, RemoteFile};
use pcs_transfer::{ByteSource, ChunkSplitter, read_chunk};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::{UploadSession, blocking_io};
use crate::error::UploadError;
use crate::retry::{self, RetryPolicy};
use crate::types::UploadEvent;

impl UploadSession<'_> {
    /// Uploads every span of `splitter` and commits the parts in index order.
    ///
    /// Chunks are read one at a time; at most `concurrency` of them are held
    /// in memory while their uploads are in flight.
    pub(crate) async fn upload_chunked(
        &self,
        splitter: ChunkSplitter,
        source: &mut dyn ByteSource,
    ) -> Result<RemoteFile, UploadError> {
        let total = splitter.chunk_count();
        let bytes_total = splitter.total_size();
        // A chunk can only be resent if the source could produce it again.
        let part_policy = if source.is_seekable() {
            self.config.retry.clone()
        } else {
            RetryPolicy::none()
        };

        let mut slots: Vec<Option<PartHash>> = vec![None; total];
        let mut spans = splitter;
        let mut in_flight = FuturesUnordered::new();
        let mut bytes_done = 0u64;

        info!(remote_path = %self.remote_path, parts = total, bytes_total, "starting chunked upload");

        loop {
            while in_flight.len() < self.config.concurrency {
                let Some(span) = spans.next() else { break };
                self.check_cancelled()?;
                let chunk = blocking_io(|| read_chunk(source, &span)).map_err(|e| {
                    UploadError::SourceUnreadable {
                        chunk_index: Some(span.index),
                        source: e,
                    }
                })?;

                let transport = self.transport;
                let policy = &part_policy;
                let cancel = self.cancel;
                in_flight.push(async move {
                    let index = chunk.index;
                    let data: &[u8] = &chunk.data;
                    let result = retry::run(
                        policy,
                        cancel,
                        |attempt, delay| {
                            warn!(chunk = index, attempt, ?delay, "retrying chunk upload");
                            self.emit(UploadEvent::ChunkRetry {
                                index,
                                attempt,
                                delay,
                            });
                        },
                        || transport.upload_part(data),
                    )
                    .await;
                    (index, data.len() as u64, result)
                });
            }

            if in_flight.is_empty() {
                break;
            }

            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                next = in_flight.next() => next,
            };
            let Some((index, len, result)) = next else {
                break;
            };
            let hash = result.map_err(|failure| self.map_failure(failure, Some(index)))?;
            debug!(chunk = index, part = %hash, "chunk uploaded");

            slots[index] = Some(hash);
            bytes_done += len;
            self.emit(UploadEvent::ChunkUploaded {
                index,
                total,
                bytes_done,
                bytes_total,
            });
        }

        let parts = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(UploadError::MissingPart(index)))
            .collect::<Result<Vec<_>, _>>()?;

        self.commit(&parts).await
    }

    /// Assembles `parts` into the remote file. Not cancellable once sent.
    async fn commit(&self, parts: &[PartHash]) -> Result<RemoteFile, UploadError> {
        self.check_cancelled()?;
        self.emit(UploadEvent::Committing { parts: parts.len() });
        debug!(remote_path = %self.remote_path, parts = parts.len(), "committing parts");

        let policy = self.non_idempotent_policy();
        // Commit runs to completion regardless of cancellation.
        let uncancellable = CancellationToken::new();
        let result = retry::run(
            &policy,
            &uncancellable,
            |attempt, delay| {
                warn!(remote_path = %self.remote_path, attempt, ?delay, "retrying commit");
            },
            || {
                self.transport
                    .commit_parts(self.remote_path, parts, self.on_duplicate)
            },
        )
        .await;

        match result {
            Ok(file) => Ok(file),
            Err(retry::RetryFailure::Failed { error, attempts }) => {
                Err(UploadError::from_commit(error, self.remote_path, attempts))
            }
            Err(retry::RetryFailure::Cancelled) => Err(UploadError::Cancelled),
        }
    }
}
