//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries state through the middleware pipeline:
//! the per-request [`RequestContext`] that handlers eventually see, and the
//! [`PipelineState`] the request has reached.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use oasgate_core::{RequestContext, RequestId};
use thiserror::Error;
use tracing::warn;

/// Where a request is in the pipeline.
///
/// ```text
/// Resolving → Authenticating → Authorizing → CheckingRequest → Dispatched
///                                                                   │
///                                                          ResponseIntercepted
///                                                                   │
///                                           Validated | PassedThrough → Sent
/// ```
///
/// States only move forward. Stages may be skipped (an operation without
/// security goes straight from `Resolving` to `Dispatched`), and errors jump
/// directly to `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Matching the request to a contract operation.
    Resolving,
    /// Verifying credentials.
    Authenticating,
    /// Checking grants.
    Authorizing,
    /// Checking parameters and body.
    CheckingRequest,
    /// The handler is running.
    Dispatched,
    /// The handler called `send` and the interceptor ran.
    ResponseIntercepted,
    /// The body was checked against a schema.
    Validated,
    /// Nothing to validate against.
    PassedThrough,
    /// The response left the pipeline.
    Sent,
}

impl PipelineState {
    const fn rank(self) -> u8 {
        match self {
            Self::Resolving => 0,
            Self::Authenticating => 1,
            Self::Authorizing => 2,
            Self::CheckingRequest => 3,
            Self::Dispatched => 4,
            Self::ResponseIntercepted => 5,
            Self::Validated | Self::PassedThrough => 6,
            Self::Sent => 7,
        }
    }

    /// Returns the state name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Authenticating => "authenticating",
            Self::Authorizing => "authorizing",
            Self::CheckingRequest => "checking_request",
            Self::Dispatched => "dispatched",
            Self::ResponseIntercepted => "response_intercepted",
            Self::Validated => "validated",
            Self::PassedThrough => "passed_through",
            Self::Sent => "sent",
        }
    }

    /// Returns true if `next` comes strictly after this state.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A refused state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move from {from} to {to}")]
pub struct StateError {
    /// The current state.
    pub from: PipelineState,
    /// The requested state.
    pub to: PipelineState,
}

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use oasgate_middleware::context::{MiddlewareContext, PipelineState};
/// use http::Method;
///
/// let mut ctx = MiddlewareContext::new(Method::GET, "/pets/1");
/// assert_eq!(ctx.state(), PipelineState::Resolving);
///
/// ctx.advance(PipelineState::Dispatched).unwrap();
/// assert!(ctx.advance(PipelineState::Authenticating).is_err());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request: RequestContext,
    state: PipelineState,
    trail: Vec<PipelineState>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a context for a request with a fresh request ID.
    #[must_use]
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self::from_request_context(RequestContext::new(method, path))
    }

    /// Wraps an existing request context.
    #[must_use]
    pub fn from_request_context(request: RequestContext) -> Self {
        Self {
            request,
            state: PipelineState::Resolving,
            trail: vec![PipelineState::Resolving],
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id()
    }

    /// The per-request context.
    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Mutable access to the per-request context.
    pub fn request_mut(&mut self) -> &mut RequestContext {
        &mut self.request
    }

    /// The current pipeline state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state this request has been in, oldest first.
    #[must_use]
    pub fn trail(&self) -> &[PipelineState] {
        &self.trail
    }

    /// Moves the request to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if `next` does not come after the current
    /// state; the state is left unchanged.
    pub fn advance(&mut self, next: PipelineState) -> Result<(), StateError> {
        if !self.state.can_advance_to(next) {
            return Err(StateError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.trail.push(next);
        Ok(())
    }

    /// Like [`advance`](Self::advance), logging a refused transition
    /// instead of returning it.
    pub fn enter(&mut self, next: PipelineState) {
        if let Err(err) = self.advance(next) {
            warn!(request_id = %self.request_id(), error = %err, "pipeline state not advanced");
        }
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Converts into the request context handed to handlers.
    #[must_use]
    pub fn into_request_context(self) -> RequestContext {
        self.request
    }
}
