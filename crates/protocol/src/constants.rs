/// Base URL of the metadata endpoints; requests append `/{resource}?method=...`.
pub const API_BASE_URL: &str = "https://pcs.baidu.com/rest/2.0/pcs";

/// Upload host. Multipart bodies must be sent here rather than to the API host.
pub const UPLOAD_BASE_URL: &str = "https://c.pcs.baidu.com/rest/2.0/pcs";

/// Download host (supports HTTP `Range`).
pub const DOWNLOAD_BASE_URL: &str = "https://d.pcs.baidu.com/rest/2.0/pcs";

/// OAuth token endpoint used to refresh an access token.
pub const OAUTH_TOKEN_URL: &str = "https://openapi.baidu.com/oauth/2.0/token";

/// Largest single upload (and largest part) the server accepts: 2 GiB.
pub const MAX_PART_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Fewest parts a `createsuperfile` call accepts.
pub const MIN_PARTS: usize = 2;

/// Most parts a `createsuperfile` call accepts.
pub const MAX_PARTS: usize = 1024;

/// Length of the leading slice hashed for rapid upload (256 KiB).
pub const RAPID_SLICE_SIZE: usize = 256 * 1024;

/// Files smaller than this are never eligible for rapid upload.
pub const RAPID_UPLOAD_MIN_SIZE: u64 = RAPID_SLICE_SIZE as u64;

/// Longest remote path the server accepts, in characters.
pub const MAX_REMOTE_PATH_LEN: usize = 1000;

/// Characters the server forbids anywhere in a remote path.
pub const FORBIDDEN_PATH_CHARS: &[char] = &['\\', '?', '|', '"', '>', '<', ':', '*'];

/// Server error codes the client needs to tell apart.
pub mod error_code {
    /// Access token is invalid.
    pub const INVALID_TOKEN: i64 = 110;
    /// Access token has expired.
    pub const EXPIRED_TOKEN: i64 = 111;
    /// Target path already holds a file (and `ondup` was not given).
    pub const FILE_ALREADY_EXISTS: i64 = 31061;
    /// Path does not exist.
    pub const FILE_NOT_FOUND: i64 = 31066;
    /// Rapid upload found no content with the given hashes.
    pub const RAPID_MD5_NOT_FOUND: i64 = 31079;
    /// A part listed in `block_list` is unknown or malformed.
    pub const SUPERFILE_BLOCK_INVALID: i64 = 31363;
}
