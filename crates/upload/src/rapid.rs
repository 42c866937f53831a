//! Rapid-upload attempt.

use pcs_protocol::RemoteFile;
use pcs_protocol::constants::RAPID_UPLOAD_MIN_SIZE;
use pcs_transfer::{ByteSource, TransferError, UploadDescriptor};
use tracing::{debug, info};

use crate::coordinator::{UploadSession, blocking_io};
use crate::error::UploadError;
use crate::retry;
use crate::transport::RapidOutcome;
use crate::types::UploadEvent;

impl UploadSession<'_> {
    /// Registers the file by content identity if the server already has it.
    ///
    /// Returns `None` when the attempt is skipped or misses; the caller then
    /// sends the bytes.
    pub(crate) async fn try_rapid(
        &self,
        source: &mut dyn ByteSource,
    ) -> Result<Option<RemoteFile>, UploadError> {
        if !self.config.rapid_upload {
            return Ok(None);
        }
        if !source.is_seekable() {
            debug!(remote_path = %self.remote_path, "source not re-readable, skipping rapid upload");
            return Ok(None);
        }
        let size = source.size();
        if size < RAPID_UPLOAD_MIN_SIZE {
            debug!(remote_path = %self.remote_path, size, "below rapid upload minimum");
            return Ok(None);
        }

        self.emit(UploadEvent::Hashing {
            remote_path: self.remote_path.to_string(),
            size,
        });
        let descriptor = blocking_io(|| {
            UploadDescriptor::compute_with(source, || self.cancel.is_cancelled())
        })
        .map_err(|e| match e {
            TransferError::Interrupted { offset } => {
                debug!(remote_path = %self.remote_path, offset, "hashing cancelled");
                UploadError::Cancelled
            }
            e => UploadError::SourceUnreadable {
                chunk_index: None,
                source: e,
            },
        })?;
        self.check_cancelled()?;

        let policy = self.non_idempotent_policy();
        let outcome = retry::run(
            &policy,
            self.cancel,
            |_, _| {},
            || {
                self.transport
                    .rapid_register(self.remote_path, &descriptor, self.on_duplicate)
            },
        )
        .await
        .map_err(|failure| self.map_failure(failure, None))?;

        match outcome {
            RapidOutcome::Registered(file) => {
                info!(remote_path = %self.remote_path, md5 = %descriptor.content_md5, "rapid upload hit");
                self.emit(UploadEvent::RapidHit {
                    remote_path: self.remote_path.to_string(),
                });
                Ok(Some(file))
            }
            RapidOutcome::Miss => {
                debug!(remote_path = %self.remote_path, "rapid upload miss");
                self.emit(UploadEvent::RapidMiss {
                    remote_path: self.remote_path.to_string(),
                });
                Ok(None)
            }
        }
    }
}
