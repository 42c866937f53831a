//! Chunked and rapid upload coordinator.
//!
//! Turns an arbitrarily large [`ByteSource`](pcs_transfer::ByteSource) into
//! one remote file. The coordinator has no transport of its own: callers
//! provide an [`UploadTransport`] that performs the actual remote calls.
//!
//! # Pipeline
//!
//! 1. **Validate**: reject empty paths and bad configuration
//! 2. **Rapid**: hash the source and try to register it without transfer
//! 3. **Split**: cut the source into deterministic chunks
//! 4. **Upload**: send chunks with bounded concurrency and per-chunk retry
//! 5. **Commit**: assemble the parts, in source order, into one file

mod chunked;
pub mod coordinator;
pub mod error;
mod rapid;
pub mod retry;
pub mod transport;
pub mod types;

pub use coordinator::UploadCoordinator;
pub use error::{TransportError, UploadError};
pub use retry::RetryPolicy;
pub use transport::{RapidOutcome, TransportFuture, UploadTransport};
pub use types::{UploadConfig, UploadEvent, UploadMethod, UploadOutcome, UploadRequest};
