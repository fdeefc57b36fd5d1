//! HTTP Range request parsing module
//!
//! Single `bytes=` ranges only. Multi-range and malformed headers are
//! ignored and the full content is served instead.

/// Inclusive byte span selected by a Range header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Serve the given span with 206
    Valid(ByteRange),
    /// Well-formed but outside the file, answer 416
    NotSatisfiable,
    /// No usable Range header, serve everything
    None,
}

/// Parse a Range header against a file of `file_size` bytes
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(ranges) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeParseResult::None;
    };
    if ranges.contains(',') {
        return RangeParseResult::None;
    }
    let Some((first, last)) = ranges.trim().split_once('-') else {
        return RangeParseResult::None;
    };

    if first.is_empty() {
        // bytes=-N: the final N bytes
        let Ok(suffix) = last.parse::<u64>() else {
            return RangeParseResult::None;
        };
        if suffix == 0 || file_size == 0 {
            return RangeParseResult::NotSatisfiable;
        }
        return RangeParseResult::Valid(ByteRange {
            start: file_size.saturating_sub(suffix),
            end: file_size - 1,
        });
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeParseResult::None;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return RangeParseResult::None,
        }
    };

    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let last_byte = file_size - 1;
    RangeParseResult::Valid(ByteRange {
        start,
        end: end.map_or(last_byte, |e| e.min(last_byte)),
    })
}
