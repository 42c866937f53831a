//! Remote primitives the coordinator drives.
//!
//! `UploadTransport` is implemented by the application on top of the HTTP
//! client. Using a trait keeps upload logic decoupled from the wire and
//! testable with mocks.

use std::future::Future;
use std::pin::Pin;

use pcs_protocol::{OnDuplicate, PartHash, RemoteFile};
use pcs_transfer::UploadDescriptor;

use crate::error::TransportError;

/// Boxed future returned by every transport call.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Result of a rapid-upload registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RapidOutcome {
    /// The server already held the content and created the file.
    Registered(RemoteFile),
    /// The server holds no matching content; the bytes must be sent.
    Miss,
}

/// Authenticated access to the storage service.
///
/// Implementations attach the credential to every call and classify
/// failures into [`TransportError`] variants. An invalid or expired token
/// must be reported as [`TransportError::Unauthorized`].
pub trait UploadTransport: Send + Sync {
    /// Uploads one chunk as a temporary part and returns its part hash.
    fn upload_part<'a>(&'a self, data: &'a [u8]) -> TransportFuture<'a, PartHash>;

    /// Assembles previously uploaded parts, in list order, into `remote_path`.
    fn commit_parts<'a>(
        &'a self,
        remote_path: &'a str,
        parts: &'a [PartHash],
        on_duplicate: OnDuplicate,
    ) -> TransportFuture<'a, RemoteFile>;

    /// Registers `remote_path` by content identity without sending bytes.
    fn rapid_register<'a>(
        &'a self,
        remote_path: &'a str,
        descriptor: &'a UploadDescriptor,
        on_duplicate: OnDuplicate,
    ) -> TransportFuture<'a, RapidOutcome>;

    /// Uploads a whole file in a single call.
    fn upload_file<'a>(
        &'a self,
        remote_path: &'a str,
        data: &'a [u8],
        on_duplicate: OnDuplicate,
    ) -> TransportFuture<'a, RemoteFile>;
}
