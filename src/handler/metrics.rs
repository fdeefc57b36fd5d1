//! Hit counter endpoints

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use crate::counter::HitCounter;
use crate::http;

/// `GET /metrics`: current file server hit count
pub fn handle_metrics(hits: &HitCounter) -> Response<Full<Bytes>> {
    http::build_text_response(StatusCode::OK, format!("Hits: {}", hits.load()))
}

/// `POST /reset`: zero the hit count
pub fn handle_reset(hits: &HitCounter) -> Response<Full<Bytes>> {
    hits.reset();
    http::build_text_response(StatusCode::OK, "Hits reset to 0")
}
