//! Wire types and constants for the PCS object-storage REST API.
//!
//! Every endpoint answers with a flat JSON object; failures carry an
//! [`ApiErrorBody`] with a numeric `error_code`.

pub mod constants;
pub mod types;

pub use types::{
    ApiErrorBody, FileEntry, FileList, OAuthErrorBody, OnDuplicate, ParseOnDuplicateError,
    PartHash, QuotaInfo, RemoteFile, TmpfileResponse, TokenResponse,
};
