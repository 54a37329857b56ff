//! The response writer handed to operation handlers.
//!
//! A [`Responder`] collects a status and headers, then hands the payload
//! to its [`SendInterceptor`] on [`Responder::send`]. The interceptor decides
//! what is actually transmitted. Only the first `send` is honored.
//!
//! ```text
//! handler ── status/header ──► Responder ── send(payload) ──► SendInterceptor
//!                                   │                              │
//!                                   └─────── ResponseSlot ◄────────┘
//!                                                  │
//!                                               pipeline
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::header::{AsHeaderName, HeaderMap, HeaderValue, IntoHeaderName};
use http::StatusCode;
use oasgate_sentinel::Payload;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::types::Response;

/// What the handler asked to send, before interception.
#[derive(Debug, Clone)]
pub struct Outgoing {
    /// Status set by the handler.
    pub status: StatusCode,
    /// Headers set by the handler.
    pub headers: HeaderMap,
    /// The handler's payload.
    pub payload: Payload,
}

/// What the interceptor decided to transmit.
#[derive(Debug)]
pub struct Transmission {
    /// The final response.
    pub response: Response,
    /// Whether the body was checked against a schema.
    pub validated: bool,
}

/// Hook run between `send` and the actual transmission.
pub trait SendInterceptor: Send + Sync {
    /// Turns the handler's output into the response to transmit.
    fn intercept(&self, outgoing: Outgoing) -> Transmission;
}

/// Errors returned by [`Responder`].
#[derive(Debug, Error)]
pub enum SendError {
    /// `send` was already called for this request.
    #[error("response already sent")]
    AlreadySent,

    /// The value could not be converted into a payload.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct SlotInner {
    sent: AtomicBool,
    transmission: Mutex<Option<Transmission>>,
}

/// The pipeline's side of a [`Responder`].
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot {
    inner: Arc<SlotInner>,
}

impl ResponseSlot {
    /// Returns true once `send` succeeded.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.inner.sent.load(Ordering::Acquire)
    }

    /// Takes the transmitted response, if any.
    #[must_use]
    pub fn take(&self) -> Option<Transmission> {
        self.inner.transmission.lock().take()
    }
}

/// Response writer for one request.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use http::StatusCode;
/// use oasgate_middleware::{PassThrough, Responder, SendError};
/// use serde_json::json;
///
/// let (mut res, slot) = Responder::new(Arc::new(PassThrough));
/// res.status(StatusCode::CREATED);
/// res.send(json!({ "id": 1 })).unwrap();
///
/// assert!(matches!(res.send(json!({})), Err(SendError::AlreadySent)));
/// let sent = slot.take().unwrap();
/// assert_eq!(sent.response.status(), StatusCode::CREATED);
/// ```
pub struct Responder {
    status: StatusCode,
    headers: HeaderMap,
    interceptor: Arc<dyn SendInterceptor>,
    slot: ResponseSlot,
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("sent", &self.slot.is_sent())
            .finish_non_exhaustive()
    }
}

impl Responder {
    /// Creates a responder and the slot its response lands in.
    #[must_use]
    pub fn new(interceptor: Arc<dyn SendInterceptor>) -> (Self, ResponseSlot) {
        let slot = ResponseSlot::default();
        let responder = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            interceptor,
            slot: slot.clone(),
        };
        (responder, slot)
    }

    /// Sets the status code. Defaults to 200.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// The status code that will be sent.
    #[must_use]
    pub fn current_status(&self) -> StatusCode {
        self.status
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a header set so far.
    #[must_use]
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Returns true once a response was sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.slot.is_sent()
    }

    /// Sends `payload` through the interceptor.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::AlreadySent`] on every call after the first;
    /// the first response is kept.
    pub fn send(&self, payload: impl Into<Payload>) -> Result<(), SendError> {
        if self
            .slot
            .inner
            .sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(status = self.status.as_u16(), "response already sent, ignoring second send");
            return Err(SendError::AlreadySent);
        }

        let transmission = self.interceptor.intercept(Outgoing {
            status: self.status,
            headers: self.headers.clone(),
            payload: payload.into(),
        });
        *self.slot.inner.transmission.lock() = Some(transmission);
        Ok(())
    }

    /// Serializes `value` and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Serialize`] if `value` cannot be serialized, or
    /// [`SendError::AlreadySent`] as for [`send`](Self::send).
    pub fn json<T: Serialize>(&self, value: &T) -> Result<(), SendError> {
        let value = serde_json::to_value(value)?;
        self.send(value)
    }
}
