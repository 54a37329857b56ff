//! Fixed-order request pipeline.
//!
//! ## Pipeline Stages
//!
//! 1. **Route Resolution** - Match the request to a contract operation (404)
//! 2. **Authentication** - Verify credentials when security is enabled (401)
//! 3. **Authorization** - Check grants when access control is enabled (403)
//! 4. **Dispatch** - Run the handler; its `send` is intercepted and checked
//!
//! Authentication and authorization are only installed when enabled, and
//! skip operations without security requirements at runtime.

use std::fmt;
use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{Endpoint, Middleware, Next};
use crate::types::{Request, Response};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The request pipeline: ordered stages ending in an endpoint.
///
/// # Example
///
/// ```ignore
/// use oasgate_middleware::pipeline::Pipeline;
/// use oasgate_middleware::stages::{Dispatch, RouteResolution};
///
/// let pipeline = Pipeline::builder(Dispatch::new(dispatcher, Some(validator)))
///     .stage(RouteResolution::new(contract))
///     .build();
///
/// let mut ctx = MiddlewareContext::new(method, path);
/// let response = pipeline.process(&mut ctx, request).await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    endpoint: Arc<dyn Endpoint>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline builder ending in `endpoint`.
    #[must_use]
    pub fn builder<E: Endpoint>(endpoint: E) -> PipelineBuilder {
        PipelineBuilder::new(endpoint)
    }

    /// Processes a request through every stage, then the endpoint.
    pub async fn process(&self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        let next = self.build_chain();
        next.run(ctx, request).await
    }

    fn build_chain(&self) -> Next<'_> {
        let mut next = Next::endpoint(self.endpoint.as_ref());
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages, not counting the endpoint.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
    endpoint: Arc<dyn Endpoint>,
}

impl PipelineBuilder {
    /// Creates a builder ending in `endpoint`.
    #[must_use]
    pub fn new<E: Endpoint>(endpoint: E) -> Self {
        Self {
            stages: Vec::new(),
            endpoint: Arc::new(endpoint),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a stage if `enabled`.
    #[must_use]
    pub fn stage_if<M: Middleware>(self, enabled: bool, middleware: impl FnOnce() -> M) -> Self {
        if enabled {
            self.stage(middleware())
        } else {
            self
        }
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            endpoint: self.endpoint,
        }
    }
}

/// Pipeline stage marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: contract operation lookup
    RouteResolution = 1,
    /// Stage 2: credential verification
    Authentication = 2,
    /// Stage 3: grant checks
    Authorization = 3,
    /// Stage 4: parameter and body checks
    RequestValidation = 4,
    /// Stage 5: handler call and response interception
    Dispatch = 5,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RouteResolution => "route_resolution",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::RequestValidation => "request_validation",
            Self::Dispatch => "dispatch",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::RouteResolution,
            Self::Authentication,
            Self::Authorization,
            Self::RequestValidation,
            Self::Dispatch,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxFuture;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;
    use parking_lot::Mutex;

    struct OrderTrackingMiddleware {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.order.lock().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn name(&self) -> &'static str {
            "short_circuit"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async { Response::with_body(StatusCode::FORBIDDEN, "text/plain", Bytes::new()) })
        }
    }

    struct Ok200(Arc<Mutex<Vec<&'static str>>>);

    impl Endpoint for Ok200 {
        fn call<'a>(&'a self, _ctx: &'a mut MiddlewareContext, _request: Request) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.0.lock().push("endpoint");
                Response::with_body(StatusCode::OK, "text/plain", Bytes::from("OK"))
            })
        }
    }

    fn create_test_request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(Ok200(order.clone()))
            .stage(OrderTrackingMiddleware {
                name: "first",
                order: order.clone(),
            })
            .stage(OrderTrackingMiddleware {
                name: "second",
                order: order.clone(),
            })
            .build();

        let mut ctx = MiddlewareContext::new(Method::GET, "/test");
        let response = pipeline.process(&mut ctx, create_test_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*order.lock(), vec!["first", "second", "endpoint"]);
        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_endpoint() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(Ok200(order.clone()))
            .stage(ShortCircuit)
            .build();

        let mut ctx = MiddlewareContext::new(Method::GET, "/test");
        let response = pipeline.process(&mut ctx, create_test_request()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(order.lock().is_empty());
    }

    #[test]
    fn test_stage_if() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(Ok200(order))
            .stage_if(false, || ShortCircuit)
            .build();
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::RouteResolution < Stage::Authentication);
        assert!(Stage::Authentication < Stage::Authorization);
        assert!(Stage::Authorization < Stage::RequestValidation);
        assert!(Stage::RequestValidation < Stage::Dispatch);
        assert_eq!(Stage::all().map(Stage::name), [
            "route_resolution",
            "authentication",
            "authorization",
            "request_validation",
            "dispatch"
        ]);
    }
}
