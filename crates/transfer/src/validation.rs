use pcs_protocol::constants::{FORBIDDEN_PATH_CHARS, MAX_REMOTE_PATH_LEN};

use crate::TransferError;

/// Whitespace the server refuses at either end of a path component.
const EDGE_WHITESPACE: &[char] = &['\r', '\n', '\t', ' ', '\0', '\x0B'];

/// Minimal check applied before any network call: the path is not empty.
pub fn validate_remote_path_shape(remote_path: &str) -> Result<(), TransferError> {
    if remote_path.trim().is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }
    Ok(())
}

/// Validates a remote path against the server's naming rules.
///
/// Rejects:
/// - Empty paths and paths not starting with `/`
/// - Paths longer than 1000 characters
/// - Any of `\ ? | " > < : *`
/// - Components that begin or end with `.` or whitespace (this also rules
///   out `.` and `..`)
pub fn validate_remote_path(remote_path: &str) -> Result<(), TransferError> {
    validate_remote_path_shape(remote_path)?;

    if !remote_path.starts_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "remote path must be absolute: {remote_path}"
        )));
    }

    if remote_path.chars().count() > MAX_REMOTE_PATH_LEN {
        return Err(TransferError::InvalidPath(format!(
            "remote path longer than {MAX_REMOTE_PATH_LEN} characters"
        )));
    }

    if let Some(c) = remote_path.chars().find(|c| FORBIDDEN_PATH_CHARS.contains(c)) {
        return Err(TransferError::InvalidPath(format!(
            "forbidden character {c:?} in {remote_path}"
        )));
    }

    for component in remote_path.split('/').filter(|c| !c.is_empty()) {
        let bad_edge = |c: char| c == '.' || EDGE_WHITESPACE.contains(&c);
        let starts_bad = component.chars().next().is_some_and(bad_edge);
        let ends_bad = component.chars().next_back().is_some_and(bad_edge);
        if starts_bad || ends_bad {
            return Err(TransferError::InvalidPath(format!(
                "component {component:?} may not begin or end with a dot or whitespace"
            )));
        }
    }

    Ok(())
}
