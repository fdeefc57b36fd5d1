//! Chirp validation endpoint
//!
//! `POST /validate_chirp` takes `{"body": "<text>"}` and answers
//! `{"valid": true}` or `{"error": "<reason>"}`.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::http;
use crate::logger;

/// Longest accepted chirp, in UTF-8 bytes
pub const MAX_CHIRP_LENGTH: usize = 140;

/// Request payload
///
/// Only a JSON object is accepted. The `body` key matches case-insensitively
/// and when it appears more than once the last occurrence wins.
#[derive(Debug)]
struct ChirpParams {
    body: String,
}

impl<'de> Deserialize<'de> for ChirpParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = ChirpParams;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object with a string `body` field")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ChirpParams, A::Error> {
                let mut body = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case("body") {
                        body = Some(map.next_value::<String>()?);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                let body = body.ok_or_else(|| de::Error::missing_field("body"))?;
                Ok(ChirpParams { body })
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

#[derive(Debug, Serialize)]
struct ValidResponse {
    valid: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Why a chirp was rejected; the message is what the client sees
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChirpError {
    #[error("Invalid request body")]
    InvalidBody,
    #[error("Chirp is too long")]
    TooLong,
    #[error("Request body too large")]
    BodyTooLarge,
}

impl ChirpError {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidBody | Self::TooLong => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        http::build_json_response(
            self.status(),
            &ErrorResponse {
                error: self.to_string(),
            },
        )
    }
}

/// Check a raw request body
///
/// Only the first JSON value is decoded; anything after it is ignored.
/// Length is the byte length of the `body` string, not its character count.
pub fn validate_chirp(raw: &[u8]) -> Result<(), ChirpError> {
    let params = serde_json::Deserializer::from_slice(raw)
        .into_iter::<ChirpParams>()
        .next()
        .ok_or(ChirpError::InvalidBody)?
        .map_err(|_| ChirpError::InvalidBody)?;

    if params.body.len() > MAX_CHIRP_LENGTH {
        return Err(ChirpError::TooLong);
    }
    Ok(())
}

/// `POST /validate_chirp`
pub async fn handle_validate_chirp<B>(body: B, max_body_size: u64) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let raw = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_warning(&format!(
                "Request body too large (max: {max_body_size} bytes)"
            ));
            return ChirpError::BodyTooLarge.into_response();
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return ChirpError::InvalidBody.into_response();
        }
    };

    match validate_chirp(&raw) {
        Ok(()) => http::build_json_response(StatusCode::OK, &ValidResponse { valid: true }),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::CONTENT_TYPE;

    const MAX_BODY: u64 = 1_048_576;

    fn chirp_json(text: &str) -> Full<Bytes> {
        let json = serde_json::json!({ "body": text }).to_string();
        Full::new(Bytes::from(json))
    }

    async fn call(body: Full<Bytes>) -> (StatusCode, serde_json::Value) {
        let resp = handle_validate_chirp(body, MAX_BODY).await;
        let status = resp.status();
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_short_chirp_is_valid() {
        let (status, body) = call(chirp_json("hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"valid": true}));
    }

    #[tokio::test]
    async fn test_length_boundary() {
        let (status, body) = call(chirp_json(&"a".repeat(140))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"valid": true}));

        let (status, body) = call(chirp_json(&"a".repeat(141))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Chirp is too long"}));
    }

    #[tokio::test]
    async fn test_length_counts_bytes_not_chars() {
        // 47 characters, 141 bytes
        let (status, body) = call(chirp_json(&"€".repeat(47))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Chirp is too long"}));

        let (status, _) = call(chirp_json(&"€".repeat(46))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, body) = call(Full::new(Bytes::from_static(b"not json"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Invalid request body"}));
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let resp = handle_validate_chirp(chirp_json("hello"), 4).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"{\"error\":\"Request body too large\"}\n");
    }

    #[test]
    fn test_rejected_shapes() {
        assert_eq!(validate_chirp(b""), Err(ChirpError::InvalidBody));
        assert_eq!(validate_chirp(b"{}"), Err(ChirpError::InvalidBody));
        assert_eq!(validate_chirp(br#"{"body": 42}"#), Err(ChirpError::InvalidBody));
        assert_eq!(validate_chirp(br#"{"body": null}"#), Err(ChirpError::InvalidBody));
        assert_eq!(validate_chirp(br#"["hello"]"#), Err(ChirpError::InvalidBody));
        assert_eq!(validate_chirp(br#""hello""#), Err(ChirpError::InvalidBody));
    }

    #[tokio::test]
    async fn test_array_body_is_invalid() {
        let long = serde_json::json!(["a".repeat(141)]).to_string();
        let (status, body) = call(Full::new(Bytes::from(long))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Invalid request body"}));
    }

    #[test]
    fn test_key_matching() {
        assert_eq!(validate_chirp(br#"{"Body": "hi"}"#), Ok(()));
        assert_eq!(validate_chirp(br#"{"BODY": "hi"}"#), Ok(()));
        assert_eq!(validate_chirp(br#"{"body": "a", "body": "b"}"#), Ok(()));

        // last occurrence decides the length check
        let long = "a".repeat(141);
        let last_long = format!(r#"{{"body": "short", "Body": "{long}"}}"#);
        assert_eq!(validate_chirp(last_long.as_bytes()), Err(ChirpError::TooLong));
        let last_short = format!(r#"{{"body": "{long}", "body": "short"}}"#);
        assert_eq!(validate_chirp(last_short.as_bytes()), Ok(()));
    }

    #[test]
    fn test_lenient_decoding() {
        assert_eq!(validate_chirp(br#"{"body": "hi", "extra": 1}"#), Ok(()));
        assert_eq!(validate_chirp(br#"{"body": "hi"} trailing"#), Ok(()));
        assert_eq!(validate_chirp(br#"{"body": ""}"#), Ok(()));
    }
}
