//! Liveness endpoint

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use crate::http;

/// `GET /healthz`
pub fn handle_healthz() -> Response<Full<Bytes>> {
    http::build_text_response(StatusCode::OK, "OK")
}
