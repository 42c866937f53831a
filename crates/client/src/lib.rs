//! Async client for the PCS object-storage REST API.
//!
//! Wraps every endpoint the upload coordinator and the CLI need, with the
//! access token attached to each request, plus OAuth token refresh.

pub mod client;
pub mod oauth;
pub mod types;

#[cfg(test)]
mod mock;

pub use client::{Client, Error};
pub use types::{ByteRange, ListOptions, RequestOptions, SortBy, SortOrder};
