//! Authorization stage.
//!
//! Checks the authenticated principal against the expanded grants of its
//! scheme. Requests without a principal pass through; denials are answered
//! with 403.

use std::sync::Arc;

use oasgate_authz::{AccessDecision, SecurityRegistry};
use oasgate_core::GateError;
use tracing::{debug, warn};

use crate::context::{MiddlewareContext, PipelineState};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};

/// Stage that enforces grants.
#[derive(Debug, Clone)]
pub struct Authorization {
    registry: Arc<SecurityRegistry>,
}

impl Authorization {
    /// Creates the stage over the loaded grant tables.
    #[must_use]
    pub fn new(registry: Arc<SecurityRegistry>) -> Self {
        Self { registry }
    }
}

impl Middleware for Authorization {
    fn name(&self) -> &'static str {
        Stage::Authorization.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let (Some(operation), Some(principal)) =
                (ctx.request().operation().cloned(), ctx.request().principal().cloned())
            else {
                return next.run(ctx, request).await;
            };

            ctx.enter(PipelineState::Authorizing);
            match self.registry.authorize(&principal, &operation, ctx.request().params()) {
                AccessDecision::Allow { role } => {
                    debug!(request_id = %ctx.request_id(), role = %role, "request authorized");
                    next.run(ctx, request).await
                }
                AccessDecision::Deny { reason } => {
                    warn!(
                        request_id = %ctx.request_id(),
                        template = operation.template(),
                        http.method = %operation.method(),
                        reason = %reason,
                        "authorization denied"
                    );
                    ctx.enter(PipelineState::Sent);
                    let handler_id = operation.operation_id().unwrap_or(operation.template());
                    Response::from_gate_error(&GateError::authorization_for_operation(reason, handler_id))
                }
            }
        })
    }
}
