//! Request validation stage.
//!
//! Checks path, query, header and cookie parameters and the JSON body of a
//! resolved request against the operation's schemas. Violations are
//! answered with 400 and the handler never runs.
//!
//! ```text
//! Request → RouteResolution → Authentication → Authorization → [RequestValidation] → Dispatch
//! ```

use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use oasgate_core::GateError;
use oasgate_sentinel::{RequestCheck, RequestValidator};
use tracing::{debug, warn};

use crate::context::{MiddlewareContext, PipelineState};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};

/// Stage that rejects requests the contract does not allow.
#[derive(Debug, Clone)]
pub struct RequestValidation {
    validator: Arc<RequestValidator>,
}

impl RequestValidation {
    /// Creates the stage over precompiled request schemas.
    #[must_use]
    pub fn new(validator: Arc<RequestValidator>) -> Self {
        Self { validator }
    }
}

impl Middleware for RequestValidation {
    fn name(&self) -> &'static str {
        Stage::RequestValidation.name()
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

            ctx.enter(PipelineState::CheckingRequest);
            let (parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            let result = {
                let params: Vec<(&str, &str)> = ctx.request().params().iter().collect();
                self.validator.check(RequestCheck {
                    operation: &operation,
                    path_params: &params,
                    query: parts.uri.query(),
                    headers: &parts.headers,
                    body: &body,
                })
            };

            if !result.valid {
                warn!(
                    request_id = %ctx.request_id(),
                    template = operation.template(),
                    http.method = %operation.method(),
                    errors = result.errors.len(),
                    "request validation failed"
                );
                ctx.enter(PipelineState::Sent);
                return Response::from_gate_error(&GateError::request_validation(result.errors_json()));
            }

            debug!(request_id = %ctx.request_id(), "request validated");
            next.run(ctx, Request::from_parts(parts, Full::new(body))).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Endpoint;
    use crate::pipeline::Pipeline;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use oasgate_core::ContractDocument;
    use oasgate_router::Params;
    use serde_json::{json, Value};

    struct EchoBody;

    impl Endpoint for EchoBody {
        fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                ctx.enter(PipelineState::Sent);
                let body = request.into_body().collect().await.unwrap().to_bytes();
                Response::with_body(StatusCode::OK, "application/json", body)
            })
        }
    }

    fn create_test_contract() -> ContractDocument {
        ContractDocument::from_value(json!({
            "paths": {
                "/pets/{petId}": {
                    "patch": {
                        "parameters": [
                            { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer" } },
                            { "name": "notify", "in": "query", "schema": { "type": "boolean" } }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "required": ["name"],
                                "properties": { "name": { "type": "string" } }
                            } } }
                        },
                        "responses": { "200": { "description": "patched" } }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn create_test_pipeline(contract: &ContractDocument) -> Pipeline {
        let validator = RequestValidator::from_contract(contract, true).unwrap();
        Pipeline::builder(EchoBody)
            .stage(RequestValidation::new(Arc::new(validator)))
            .build()
    }

    fn create_test_context(contract: &ContractDocument, pet_id: &str) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new(Method::PATCH, format!("/pets/{pet_id}"));
        let operation = Arc::clone(contract.operation("/pets/{petId}", &Method::PATCH).unwrap());
        let mut params = Params::new();
        params.push("petId", pet_id);
        ctx.request_mut().bind_operation(operation, params);
        ctx
    }

    fn create_test_request(query: &str, body: &str) -> Request {
        http::Request::builder()
            .method(Method::PATCH)
            .uri(format!("/pets/1{query}"))
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_reaches_endpoint_with_body() {
        let contract = create_test_contract();
        let pipeline = create_test_pipeline(&contract);
        let mut ctx = create_test_context(&contract, "1");

        let response = pipeline
            .process(&mut ctx, create_test_request("?notify=false", r#"{"name":"Rex"}"#))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "name": "Rex" }));
        assert!(ctx.trail().contains(&PipelineState::CheckingRequest));
    }

    #[tokio::test]
    async fn test_invalid_request_is_400() {
        let contract = create_test_contract();
        let pipeline = create_test_pipeline(&contract);
        let mut ctx = create_test_context(&contract, "one");

        let response = pipeline
            .process(&mut ctx, create_test_request("?notify=maybe", "{}"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.state(), PipelineState::Sent);

        let body = body_json(response).await;
        assert_eq!(body[0]["message"], "Wrong data in the request. ");
        let mut paths: Vec<&str> = body[0]["error"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["path"].as_str())
            .collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["/body", "/path/petId", "/query/notify"]);
    }

    #[tokio::test]
    async fn test_missing_body_is_400() {
        let contract = create_test_contract();
        let pipeline = create_test_pipeline(&contract);
        let mut ctx = create_test_context(&contract, "1");

        let response = pipeline.process(&mut ctx, create_test_request("", "")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await[0]["error"][0]["message"], "Missing request body");
    }

    #[tokio::test]
    async fn test_unresolved_request_passes_through() {
        let contract = create_test_contract();
        let pipeline = create_test_pipeline(&contract);
        let mut ctx = MiddlewareContext::new(Method::PATCH, "/pets/1");

        let response = pipeline.process(&mut ctx, create_test_request("", "not json")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!ctx.trail().contains(&PipelineState::CheckingRequest));
    }
}
