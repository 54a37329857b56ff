//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all pipeline stages
//! implement, and the [`Endpoint`] that ends a chain. A stage either
//! enriches the context and calls [`Next::run`], or short-circuits with its
//! own response.
//!
//! # Example
//!
//! ```ignore
//! use oasgate_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             tracing::debug!(request_id = %ctx.request_id(), "before");
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once
/// - A stage that does not call `next.run()` answers the request itself
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage.
    fn name(&self) -> &'static str;

    /// Process the request through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The step at the end of a chain, run after every stage passed.
pub trait Endpoint: Send + Sync + 'static {
    /// Answers the request.
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the next stage in the chain.
///
/// Consumed on use, so it can only be run once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Endpoint(&'a dyn Endpoint),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes `middleware`, then `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the end of a chain.
    pub(crate) fn endpoint(endpoint: &'a dyn Endpoint) -> Self {
        Self {
            inner: NextInner::Endpoint(endpoint),
        }
    }

    /// Invokes the next stage or the endpoint.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Endpoint(endpoint) => endpoint.call(ctx, request).await,
        }
    }
}
