//! Authentication stage.
//!
//! For operations that declare security requirements, verifies the request
//! credentials through the [`SecurityRegistry`] and stores the resulting
//! principal. Failures are answered with 401.
//!
//! ```text
//! Request → RouteResolution → [Authentication] → Authorization → RequestValidation → Dispatch
//! ```

use std::sync::Arc;

use oasgate_authz::SecurityRegistry;
use tracing::{debug, warn};

use crate::context::{MiddlewareContext, PipelineState};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};

/// Stage that authenticates requests to secured operations.
#[derive(Debug, Clone)]
pub struct Authentication {
    registry: Arc<SecurityRegistry>,
}

impl Authentication {
    /// Creates the stage over the loaded security schemes.
    #[must_use]
    pub fn new(registry: Arc<SecurityRegistry>) -> Self {
        Self { registry }
    }
}

impl Middleware for Authentication {
    fn name(&self) -> &'static str {
        Stage::Authentication.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(operation) = ctx.request().operation().cloned() else {
                return next.run(ctx, request).await;
            };
            if !operation.has_security() {
                return next.run(ctx, request).await;
            }

            ctx.enter(PipelineState::Authenticating);
            match self.registry.authenticate(operation.security(), request.headers()) {
                Ok(principal) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        scheme = principal.scheme(),
                        "request authenticated"
                    );
                    if !principal.scheme().is_empty() {
                        ctx.request_mut().set_principal(principal);
                    }
                    next.run(ctx, request).await
                }
                Err(err) => {
                    warn!(
                        request_id = %ctx.request_id(),
                        template = operation.template(),
                        error = %err,
                        "authentication failed"
                    );
                    ctx.enter(PipelineState::Sent);
                    Response::from_gate_error(&err.to_gate_error())
                }
            }
        })
    }
}
