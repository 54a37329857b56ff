//! Send interceptors.
//!
//! [`ResponseValidationInterceptor`] runs content negotiation, response-code
//! resolution and schema validation on every handler response.
//! [`PassThrough`] renders the payload as is.

use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use mime::Mime;
use oasgate_core::OperationEntry;
use oasgate_sentinel::{
    is_json, render, ResponseCheck, ResponseValidator, DEFAULT_CONTENT_TYPE,
};

use crate::responder::{Outgoing, SendInterceptor, Transmission};
use crate::types::Response;

/// Renders the payload without checking it.
///
/// The body is JSON unless the handler set a non-JSON content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl SendInterceptor for PassThrough {
    fn intercept(&self, outgoing: Outgoing) -> Transmission {
        let Outgoing {
            status,
            mut headers,
            payload,
        } = outgoing;

        let as_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Mime>().ok())
            .map_or(true, |m| is_json(&m));
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }

        let mut response = http::Response::new(Full::new(render(payload, as_json)));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Transmission {
            response,
            validated: false,
        }
    }
}

/// Checks handler responses against the contract.
#[derive(Debug, Clone)]
pub struct ResponseValidationInterceptor {
    validator: Arc<ResponseValidator>,
    operation: Arc<OperationEntry>,
    accept: Option<String>,
}

impl ResponseValidationInterceptor {
    /// Creates an interceptor for one request to `operation`.
    #[must_use]
    pub fn new(
        validator: Arc<ResponseValidator>,
        operation: Arc<OperationEntry>,
        accept: Option<String>,
    ) -> Self {
        Self {
            validator,
            operation,
            accept,
        }
    }
}

impl SendInterceptor for ResponseValidationInterceptor {
    fn intercept(&self, outgoing: Outgoing) -> Transmission {
        if !self.validator.config().enabled {
            return PassThrough.intercept(outgoing);
        }

        let Outgoing {
            status,
            mut headers,
            payload,
        } = outgoing;

        let explicit = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let outcome = self.validator.check(ResponseCheck {
            operation: &self.operation,
            status: status.as_u16(),
            accept: self.accept.as_deref(),
            content_type: explicit.as_deref(),
            payload,
        });

        let content_type = HeaderValue::from_str(&outcome.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        headers.insert(CONTENT_TYPE, content_type);

        let mut response: Response = http::Response::new(Full::new(outcome.body));
        *response.status_mut() = StatusCode::from_u16(outcome.status).unwrap_or(status);
        *response.headers_mut() = headers;
        Transmission {
            response,
            validated: outcome.verdict.validated(),
        }
    }
}
