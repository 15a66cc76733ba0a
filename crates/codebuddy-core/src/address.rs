//! Session id extraction from connection addresses.

use crate::traits::SessionId;

/// Take the session id from the last segment of a connection path.
///
/// A single trailing slash is ignored. Returns `None` when no non-empty
/// segment remains, e.g. for `""`, `"/"` or `"/ws/code//"`.
#[must_use]
pub fn extract_session_id(path: &str) -> Option<SessionId> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let segment = trimmed.rsplit('/').next()?;

    if segment.is_empty() || segment.chars().any(char::is_whitespace) {
        return None;
    }
    Some(segment.to_owned())
}
