use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the server does when the target path already holds a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDuplicate {
    /// Reject the request.
    #[default]
    Fail,
    /// Replace the existing file in place.
    Overwrite,
    /// Keep the original and store the new file under a generated sibling name.
    Rename,
}

impl OnDuplicate {
    /// Value of the `ondup` query parameter, `None` when it must be omitted.
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            Self::Fail => None,
            Self::Overwrite => Some("overwrite"),
            Self::Rename => Some("newcopy"),
        }
    }
}

impl fmt::Display for OnDuplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fail => "fail",
            Self::Overwrite => "overwrite",
            Self::Rename => "rename",
        };
        f.write_str(s)
    }
}

/// Error returned when parsing an unknown [`OnDuplicate`] name.
#[derive(Debug, thiserror::Error)]
#[error("unknown on-duplicate policy: {0} (expected fail, overwrite or rename)")]
pub struct ParseOnDuplicateError(String);

impl FromStr for OnDuplicate {
    type Err = ParseOnDuplicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "overwrite" => Ok(Self::Overwrite),
            "rename" | "newcopy" => Ok(Self::Rename),
            _ => Err(ParseOnDuplicateError(s.to_string())),
        }
    }
}

/// Server-issued content identifier of an uploaded part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartHash(pub String);

impl PartHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PartHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PartHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A file stored on the server, as returned by `upload`, `createsuperfile`
/// and `rapidupload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(default)]
    pub fs_id: u64,
    #[serde(default)]
    pub ctime: i64,
    #[serde(default)]
    pub mtime: i64,
}

/// Response of a `upload?type=tmpfile` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmpfileResponse {
    pub md5: PartHash,
}

/// Space quota of the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub quota: u64,
    pub used: u64,
}

impl QuotaInfo {
    /// Bytes still available.
    pub fn free(&self) -> u64 {
        self.quota.saturating_sub(self.used)
    }
}

/// One entry of a `meta` or `list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(default)]
    pub fs_id: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub ctime: i64,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(default, skip_serializing_if = "is_zero_u8")]
    pub isdir: u8,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.isdir != 0
    }
}

fn is_zero_u8(v: &u8) -> bool {
    *v == 0
}

/// Envelope of `meta` and `list` responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub list: Vec<FileEntry>,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// Successful response of the OAuth token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

/// Error body of the OAuth token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}
