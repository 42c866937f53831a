//! Upload error types.

use pcs_transfer::TransferError;

/// Failure reported by an [`UploadTransport`](crate::UploadTransport) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Credential invalid or expired. Retrying will not help.
    #[error("unauthorized")]
    Unauthorized,

    /// Network failure or server-side fault worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The server refused the request; `code` is the server's error code.
    #[error("rejected ({code}): {message}")]
    Rejected { code: i64, message: String },
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Server diagnostic suitable for surfacing to the caller.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Unauthorized => "unauthorized".into(),
            Self::Transient(msg) => msg.clone(),
            Self::Rejected { code, message } => format!("error {code}: {message}"),
        }
    }
}

/// Errors produced by an upload.
///
/// Only transient chunk failures are retried locally; everything else
/// reaches the caller with enough context to decide on a full retry.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("source unreadable{}: {source}", fmt_chunk(.chunk_index))]
    SourceUnreadable {
        chunk_index: Option<usize>,
        #[source]
        source: TransferError,
    },

    #[error("transfer failed{} after {attempts} attempt(s): {message}", fmt_chunk(.chunk_index))]
    TransientTransferError {
        chunk_index: Option<usize>,
        attempts: u32,
        message: String,
    },

    #[error("commit of {remote_path} rejected: {diagnostic}")]
    CommitRejected {
        remote_path: String,
        diagnostic: String,
    },

    #[error("request for {remote_path}{} rejected: {diagnostic}", fmt_chunk(.chunk_index))]
    Rejected {
        remote_path: String,
        chunk_index: Option<usize>,
        diagnostic: String,
    },

    #[error("unauthorized: access token invalid or expired")]
    Unauthorized,

    #[error("source of {size} bytes fits in one chunk of {max_chunk_size} bytes")]
    TooSmallForChunking { size: u64, max_chunk_size: u64 },

    #[error("source needs {parts} parts, more than the server accepts")]
    TooManyParts { parts: usize },

    #[error("missing part hash for chunk {0}")]
    MissingPart(usize),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cancelled")]
    Cancelled,
}

fn fmt_chunk(index: &Option<usize>) -> String {
    index.map(|i| format!(" (chunk {i})")).unwrap_or_default()
}

impl UploadError {
    /// Maps a transport failure outside the commit step.
    pub(crate) fn from_transport(
        err: TransportError,
        remote_path: &str,
        chunk_index: Option<usize>,
        attempts: u32,
    ) -> Self {
        match err {
            TransportError::Unauthorized => Self::Unauthorized,
            TransportError::Transient(message) => Self::TransientTransferError {
                chunk_index,
                attempts,
                message,
            },
            rejected @ TransportError::Rejected { .. } => Self::Rejected {
                remote_path: remote_path.to_string(),
                chunk_index,
                diagnostic: rejected.diagnostic(),
            },
        }
    }

    /// Maps a transport failure of the commit step.
    pub(crate) fn from_commit(err: TransportError, remote_path: &str, attempts: u32) -> Self {
        match err {
            rejected @ TransportError::Rejected { .. } => Self::CommitRejected {
                remote_path: remote_path.to_string(),
                diagnostic: rejected.diagnostic(),
            },
            other => Self::from_transport(other, remote_path, None, attempts),
        }
    }
}
