//! Request path normalisation
//!
//! Turns the raw, percent-encoded request path into the list of segments a
//! file lookup may use.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes escaped in generated links: everything except unreserved and `/`
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Percent-decode a URL path
///
/// Returns `None` when the decoded bytes are not UTF-8. Malformed escapes
/// are kept literally.
pub fn decode_path(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

/// Percent-encode a path for use in an href or `Location`, keeping `/`
pub fn encode_path(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

/// Clean a decoded path into its segments
///
/// Empty and `.` segments are dropped and `..` removes the previous segment,
/// never climbing above the root.
pub fn clean_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments
}

/// Canonical form of a request path
///
/// Same segment rules as [`clean_segments`]; a trailing `/` survives unless
/// the result is the root.
pub fn clean_path(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    for segment in clean_segments(path) {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() || path.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}
