//! Dispatch endpoint.
//!
//! Runs the handler resolved for the operation, with a [`Responder`] whose
//! `send` goes through the response interceptor. Exactly one response
//! leaves this endpoint:
//!
//! - the first response the handler sent
//! - 500 if the handler failed before sending
//! - 500 if the handler finished without sending

use std::sync::Arc;

use http::header::ACCEPT;
use http_body_util::BodyExt;
use oasgate_core::GateError;
use oasgate_sentinel::ResponseValidator;
use tracing::{debug, error, warn};

use crate::context::{MiddlewareContext, PipelineState};
use crate::dispatcher::{OperationDispatcher, OperationRequest};
use crate::interceptor::{PassThrough, ResponseValidationInterceptor};
use crate::middleware::{BoxFuture, Endpoint};
use crate::responder::{Responder, SendInterceptor};
use crate::types::{Request, Response, ResponseExt};

/// Message sent when a handler returns without responding.
pub const NO_RESPONSE_MESSAGE: &str = "No response was sent for the request";

/// Endpoint that calls operation handlers.
#[derive(Debug, Clone)]
pub struct Dispatch {
    dispatcher: OperationDispatcher,
    validator: Option<Arc<ResponseValidator>>,
}

impl Dispatch {
    /// Creates the endpoint. Without a validator, responses pass through.
    #[must_use]
    pub fn new(dispatcher: OperationDispatcher, validator: Option<Arc<ResponseValidator>>) -> Self {
        Self {
            dispatcher,
            validator,
        }
    }

    /// The dispatcher used to find handlers.
    #[must_use]
    pub fn dispatcher(&self) -> &OperationDispatcher {
        &self.dispatcher
    }

    fn fail(ctx: &mut MiddlewareContext, message: impl Into<String>) -> Response {
        ctx.enter(PipelineState::Sent);
        Response::from_gate_error(&GateError::internal(message))
    }
}

impl Endpoint for Dispatch {
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(operation) = ctx.request().operation().cloned() else {
                error!(request_id = %ctx.request_id(), "dispatch reached without a resolved operation");
                return Self::fail(ctx, "No operation resolved for the request");
            };

            let resolved = match self.dispatcher.resolve(&operation) {
                Ok(resolved) => resolved,
                Err(err) => {
                    error!(request_id = %ctx.request_id(), error = %err, "handler resolution failed");
                    return Self::fail(ctx, err.to_string());
                }
            };

            let accept = request
                .headers()
                .get(ACCEPT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let interceptor: Arc<dyn SendInterceptor> = match &self.validator {
                Some(validator) => Arc::new(ResponseValidationInterceptor::new(
                    Arc::clone(validator),
                    Arc::clone(&operation),
                    accept,
                )),
                None => Arc::new(PassThrough),
            };
            let (responder, slot) = Responder::new(interceptor);

            let (parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            let operation_request = OperationRequest::new(
                ctx.request().clone(),
                parts.headers,
                parts.uri.query().map(str::to_string),
                body,
            );

            ctx.enter(PipelineState::Dispatched);
            debug!(
                request_id = %ctx.request_id(),
                controller = %resolved.controller,
                handler = %resolved.name,
                "dispatching"
            );
            let result = (resolved.handler)(operation_request, responder).await;

            if let Err(err) = &result {
                if slot.is_sent() {
                    warn!(request_id = %ctx.request_id(), error = %err, "handler failed after sending");
                } else {
                    error!(request_id = %ctx.request_id(), error = %err, "handler failed");
                    return Self::fail(ctx, err.message());
                }
            }

            let Some(transmission) = slot.take() else {
                error!(
                    request_id = %ctx.request_id(),
                    template = operation.template(),
                    "handler finished without sending a response"
                );
                return Self::fail(ctx, NO_RESPONSE_MESSAGE);
            };

            ctx.enter(PipelineState::ResponseIntercepted);
            ctx.enter(if transmission.validated {
                PipelineState::Validated
            } else {
                PipelineState::PassedThrough
            });
            ctx.enter(PipelineState::Sent);
            transmission.response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Controller, ControllerRegistry, HandlerError};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;
    use oasgate_core::ContractDocument;
    use oasgate_router::Params;
    use serde_json::{json, Value};

    fn create_test_context() -> MiddlewareContext {
        let contract = ContractDocument::from_value(json!({
            "paths": {
                "/echo": { "post": { "operationId": "echo", "responses": {} } }
            }
        }))
        .unwrap();
        let mut ctx = MiddlewareContext::new(Method::POST, "/echo");
        let operation = Arc::clone(contract.operation("/echo", &Method::POST).unwrap());
        ctx.request_mut().bind_operation(operation, Params::new());
        ctx
    }

    fn create_test_request(body: &str) -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri("/echo?verbose=1")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    fn create_test_dispatch(controller: Controller) -> Dispatch {
        let registry = ControllerRegistry::new().register("Default", controller);
        Dispatch::new(OperationDispatcher::new(registry), None)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_handler_response_is_sent() {
        let dispatch = create_test_dispatch(Controller::new().handler("echo", |req, res| async move {
            let body: Value = req.json().map_err(|e| HandlerError::with_source("bad body", e))?;
            res.send(json!({ "echo": body, "query": req.query() }))
                .map_err(|e| HandlerError::with_source("send failed", e))
        }));
        let mut ctx = create_test_context();

        let response = dispatch.call(&mut ctx, create_test_request(r#"{"a":1}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "echo": { "a": 1 }, "query": "verbose=1" }));
        assert_eq!(
            ctx.trail(),
            &[
                PipelineState::Resolving,
                PipelineState::Dispatched,
                PipelineState::ResponseIntercepted,
                PipelineState::PassedThrough,
                PipelineState::Sent,
            ]
        );
    }

    #[tokio::test]
    async fn test_no_response_is_500() {
        let dispatch = create_test_dispatch(Controller::new().handler("echo", |_req, _res| async { Ok(()) }));
        let mut ctx = create_test_context();

        let response = dispatch.call(&mut ctx, create_test_request("")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!([{ "message": NO_RESPONSE_MESSAGE }]));
        assert_eq!(ctx.state(), PipelineState::Sent);
    }

    #[tokio::test]
    async fn test_handler_error_is_500() {
        let dispatch = create_test_dispatch(
            Controller::new().handler("echo", |_req, _res| async { Err(HandlerError::new("database down")) }),
        );
        let mut ctx = create_test_context();

        let response = dispatch.call(&mut ctx, create_test_request("")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!([{ "message": "database down" }]));
    }

    #[tokio::test]
    async fn test_error_after_send_keeps_response() {
        let dispatch = create_test_dispatch(Controller::new().handler("echo", |_req, mut res| async move {
            res.status(StatusCode::CREATED);
            res.send(json!({ "ok": true })).ok();
            Err(HandlerError::new("late failure"))
        }));
        let mut ctx = create_test_context();

        let response = dispatch.call(&mut ctx, create_test_request("")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unresolved_handler_is_500() {
        let dispatch = create_test_dispatch(Controller::new());
        let mut ctx = create_test_context();

        let response = dispatch.call(&mut ctx, create_test_request("")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
