//! Per-call options and query builders.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Overrides applied to a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replaces the client's default timeout for this call.
    pub timeout: Option<Duration>,
    /// Extra headers sent with this call.
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Inclusive byte range for partial downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Last byte to return; `None` reads to the end of the file.
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn starting_at(start: u64) -> Self {
        Self { start, end: None }
    }

    pub fn inclusive(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }
}

/// Formats as the value of an HTTP `Range` header.
impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "bytes={}-{}", self.start, end),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

/// Sort key of a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Time,
    Name,
    Size,
}

impl SortBy {
    fn as_query(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Name => "name",
            Self::Size => "size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_query(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Options of a directory listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub by: Option<SortBy>,
    pub order: Option<SortOrder>,
    /// Returns entries `[start, end)`; all entries when unset.
    pub limit: Option<(u64, u64)>,
}

impl ListOptions {
    /// Query parameters for the `list` endpoint.
    pub(crate) fn to_params(self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(by) = self.by {
            params.push(("by", by.as_query().to_string()));
        }
        if let Some(order) = self.order {
            params.push(("order", order.as_query().to_string()));
        }
        if let Some((start, end)) = self.limit {
            params.push(("limit", format!("{start}-{end}")));
        }
        params
    }
}
