//! Route resolution stage.
//!
//! Matches the request path against the contract's templates and binds the
//! operation and its path parameters to the request context. Requests that
//! match nothing are answered with 404.

use std::sync::Arc;

use http::Method;
use oasgate_core::{ContractDocument, GateError, OperationEntry};
use oasgate_router::{Params, Router};
use tracing::{debug, info};

use crate::context::{MiddlewareContext, PipelineState};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};

/// Stage that resolves requests to contract operations.
#[derive(Debug, Clone)]
pub struct RouteResolution {
    contract: Arc<ContractDocument>,
    router: Router,
}

impl RouteResolution {
    /// Registers every contract operation under the contract's base path.
    #[must_use]
    pub fn new(contract: Arc<ContractDocument>) -> Self {
        let mut router = Router::new().with_base_path(contract.base_path());

        for operation in contract.operations() {
            let key = operation
                .operation_id()
                .map_or_else(|| format!("{} {}", operation.method(), operation.template()), str::to_string);
            router.route(operation.method(), operation.template(), key);
        }

        for (template, methods) in router.routes() {
            for method in methods.allowed_methods() {
                info!(
                    "Register: {} - {}{}",
                    method,
                    router.base_path(),
                    template.routing_key()
                );
            }
        }

        Self { contract, router }
    }

    /// The router built from the contract.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolves `method` and `path` to an operation and its parameters.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Option<(Arc<OperationEntry>, Params)> {
        let found = self.router.match_route(method, path)?;
        let operation = self.contract.operation(found.template.as_str(), method)?;
        Some((Arc::clone(operation), found.params))
    }
}

impl Middleware for RouteResolution {
    fn name(&self) -> &'static str {
        Stage::RouteResolution.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            let Some((operation, params)) = self.resolve(&method, &path) else {
                debug!(
                    request_id = %ctx.request_id(),
                    http.method = %method,
                    http.path = %path,
                    "no operation matches"
                );
                ctx.enter(PipelineState::Sent);
                return Response::from_gate_error(&GateError::not_found(format!("Cannot {method} {path}")));
            };

            debug!(
                request_id = %ctx.request_id(),
                template = operation.template(),
                operation_id = operation.operation_id().unwrap_or_default(),
                "operation resolved"
            );
            ctx.request_mut().bind_operation(operation, params);
            next.run(ctx, request).await
        })
    }
}
