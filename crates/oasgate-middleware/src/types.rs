//! Common types used throughout the middleware pipeline.
//!
//! This module defines the HTTP request and response types used by
//! middleware and the helpers that turn errors into response bodies.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use oasgate_core::{ErrorEnvelope, GateError};
use oasgate_sentinel::DEFAULT_CONTENT_TYPE;

/// The HTTP request type used in the middleware pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a response with the given status, content type and body.
    fn with_body(status: StatusCode, content_type: &str, body: Bytes) -> Response;

    /// Creates a JSON response carrying an error envelope.
    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response;

    /// Creates the response for a request-level error.
    fn from_gate_error(error: &GateError) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, content_type: &str, body: Bytes) -> Response {
        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        let value = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        response.headers_mut().insert(CONTENT_TYPE, value);
        response
    }

    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response {
        Self::with_body(
            status,
            DEFAULT_CONTENT_TYPE,
            Bytes::from(envelope.to_value().to_string()),
        )
    }

    fn from_gate_error(error: &GateError) -> Response {
        Self::envelope(error.status_code(), &error.to_envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    #[test]
    fn test_with_body() {
        let response = Response::with_body(StatusCode::CREATED, "text/plain", Bytes::from("ok"));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_invalid_content_type_falls_back() {
        let response = Response::with_body(StatusCode::OK, "bad\nvalue", Bytes::new());
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            DEFAULT_CONTENT_TYPE
        );
    }

    #[tokio::test]
    async fn test_gate_error_response() {
        let response = Response::from_gate_error(&GateError::authentication("Token expired"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!([{ "message": "Token expired" }]));
    }
}
