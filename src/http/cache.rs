//! HTTP cache validation module
//!
//! `Last-Modified` / `If-Modified-Since` handling for static files.

use std::time::{SystemTime, UNIX_EPOCH};

/// Format a modification time as an HTTP-date
pub fn format_last_modified(modified: SystemTime) -> String {
    httpdate::fmt_http_date(modified)
}

/// Check whether the client's cached copy is still current
///
/// HTTP-dates have one second resolution, so the file time is truncated
/// before comparing. Unparseable headers never match.
pub fn is_not_modified(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(|v| httpdate::parse_http_date(v).ok()) else {
        return false;
    };
    match (
        modified.duration_since(UNIX_EPOCH),
        since.duration_since(UNIX_EPOCH),
    ) {
        (Ok(file), Ok(client)) => file.as_secs() <= client.as_secs(),
        _ => false,
    }
}
