//! oasgate Sentinel - contract-driven request and response validation
//!
//! This crate decides which response object, media type and schema apply to
//! an outgoing response, validates the body, and turns the result into a
//! policy outcome: send unchanged, warn, or replace.
//!
//! # Overview
//!
//! - [`resolve_response`] maps a status code to its response object
//! - [`negotiate`] picks the media type from `Accept` and the declared types
//! - [`prepare_schema`] rewrites `nullable` so a Draft 4 validator understands it
//! - [`strip_undefined_slots`] drops unset object slots from a [`Payload`]
//! - [`ResponseValidator`] ties these together over precompiled schemas
//! - [`RequestValidator`] checks parameters and JSON bodies before dispatch
//! - [`check_contract`] validates the contract document itself
//!
//! # Architecture
//!
//! ```text
//!        handler send(payload)
//!                │
//!                ▼
//!   ┌──────────────────────────┐   no response object
//!   │ resolve_response(status) │──────────────────────► "Wrong response code"
//!   └────────────┬─────────────┘
//!                │ content declared
//!   ┌────────────▼─────────────┐   nothing acceptable
//!   │ negotiate(accept, types) │──────────────────────► 406
//!   └────────────┬─────────────┘
//!                │ application/json
//!   ┌────────────▼─────────────┐   invalid
//!   │ SchemaValidator::validate│──────────────────────► strict: 400 / lenient: warn
//!   └────────────┬─────────────┘
//!                ▼
//!              send
//! ```
//!
//! # Example
//!
//! ```
//! use oasgate_core::ContractDocument;
//! use oasgate_sentinel::{Payload, ResponseCheck, ResponseValidator, ValidationConfig, Verdict};
//! use http::Method;
//! use serde_json::json;
//!
//! let contract = ContractDocument::from_value(json!({
//!     "paths": { "/pets/{id}": { "get": { "responses": { "200": {
//!         "description": "A pet",
//!         "content": { "application/json": { "schema": {
//!             "type": "object", "required": ["id"],
//!             "properties": { "id": { "type": "integer" } }
//!         } } }
//!     } } } } }
//! }))
//! .unwrap();
//! let validator = ResponseValidator::from_contract(&contract, ValidationConfig::strict()).unwrap();
//! let operation = contract.operation("/pets/{id}", &Method::GET).unwrap();
//!
//! let outcome = validator.check(ResponseCheck {
//!     operation,
//!     status: 200,
//!     accept: None,
//!     content_type: None,
//!     payload: Payload::from(json!({})),
//! });
//! assert_eq!(outcome.status, 400);
//! assert_eq!(outcome.verdict, Verdict::Rejected);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod negotiation;
pub mod openapi;
pub mod payload;
pub mod request;
pub mod response_code;
pub mod schema;
pub mod validation;

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;
use mime::Mime;
use oasgate_core::{ContractDocument, ErrorEnvelope, GateError, OperationEntry};
use tracing::{debug, error, warn};

pub use config::ValidationConfig;
pub use error::{SentinelError, SentinelResult};
pub use negotiation::{content_type_header, is_json, negotiate, parse_accept, parse_declared, Negotiation};
pub use openapi::check_contract;
pub use payload::{strip_undefined_slots, Payload, DEFAULT_STRIP_DEPTH};
pub use request::{RequestCheck, RequestValidator};
pub use response_code::{resolve_response, resolve_response_key};
pub use schema::prepare_schema;
pub use validation::{SchemaValidator, ValidationError, ValidationResult};

/// Content type used when the handler did not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Prefix of bodies produced by generated mock controllers.
const MOCK_CONTROLLER_PREFIX: &str = "{\"message\":\"This is the mockup controller for ";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SchemaKey {
    template: String,
    method: Method,
    status: String,
    media_type: String,
}

/// What the validator did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The body was validated and conforms.
    Valid,
    /// The body does not conform and was sent anyway (lenient).
    Mismatch,
    /// The body does not conform and was replaced with a 400 (strict).
    Rejected,
    /// No declared media type is acceptable; answered 406.
    NotAcceptable,
    /// No response object for the status code.
    WrongCode,
    /// Nothing to validate against (no content, non-JSON or no schema).
    PassedThrough,
}

impl Verdict {
    /// Returns true if a schema was actually run against the body.
    #[must_use]
    pub fn validated(&self) -> bool {
        matches!(self, Self::Valid | Self::Mismatch | Self::Rejected)
    }
}

/// A response about to be sent.
#[derive(Debug)]
pub struct ResponseCheck<'a> {
    /// The operation that produced the response.
    pub operation: &'a OperationEntry,
    /// Status code set by the handler.
    pub status: u16,
    /// The request's `Accept` header.
    pub accept: Option<&'a str>,
    /// Content type set explicitly by the handler.
    pub content_type: Option<&'a str>,
    /// The handler's payload.
    pub payload: Payload,
}

/// The response to transmit.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOutcome {
    /// Final status code.
    pub status: u16,
    /// Final `Content-Type` header.
    pub content_type: String,
    /// Final body.
    pub body: Bytes,
    /// What happened.
    pub verdict: Verdict,
}

/// Validates outgoing responses against a contract.
///
/// All JSON response schemas are prepared and compiled when the validator
/// is built, so a broken schema fails initialization rather than a request.
#[derive(Debug)]
pub struct ResponseValidator {
    config: ValidationConfig,
    schemas: HashMap<SchemaKey, SchemaValidator>,
}

impl ResponseValidator {
    /// Compiles every `application/json` response schema in the contract.
    pub fn from_contract(contract: &ContractDocument, config: ValidationConfig) -> SentinelResult<Self> {
        let mut schemas = HashMap::new();

        for operation in contract.operations() {
            for (status, spec) in operation.responses() {
                for (media_type, schema) in spec.content() {
                    let Some(schema) = schema else { continue };
                    let json = media_type.parse::<Mime>().is_ok_and(|m| is_json(&m));
                    if !json {
                        continue;
                    }

                    let validator = SchemaValidator::compile(&prepare_schema(schema), config.ignore_unknown_formats)
                        .map_err(|e| SentinelError::ResponseSchema {
                            method: operation.method().to_string(),
                            path: operation.template().to_string(),
                            status: status.clone(),
                            media_type: media_type.clone(),
                            reason: e.to_string(),
                        })?;
                    schemas.insert(
                        SchemaKey {
                            template: operation.template().to_string(),
                            method: operation.method().clone(),
                            status: status.clone(),
                            media_type: media_type.clone(),
                        },
                        validator,
                    );
                }
            }
        }

        debug!(schema_count = schemas.len(), "response validator initialized");
        Ok(Self { config, schemas })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Number of compiled schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Checks a response and returns what should be transmitted.
    #[must_use]
    pub fn check(&self, check: ResponseCheck<'_>) -> ResponseOutcome {
        let ResponseCheck {
            operation,
            status,
            accept,
            content_type,
            payload,
        } = check;

        let payload = strip_undefined_slots(payload, DEFAULT_STRIP_DEPTH);
        let explicit: Option<Mime> = content_type.and_then(|ct| ct.parse().ok());
        let mut outcome = ResponseOutcome {
            status,
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            body: Bytes::new(),
            verdict: Verdict::PassedThrough,
        };

        let Some((status_key, spec)) = resolve_response_key(operation.responses(), status) else {
            let message = format!("Wrong response code: {status}");
            let envelope = ErrorEnvelope::message(message).to_value();
            outcome.verdict = Verdict::WrongCode;
            if self.config.strict {
                error!(
                    http.method = %operation.method(),
                    template = operation.template(),
                    "{envelope}"
                );
                outcome.body = Bytes::from(envelope.to_string());
            } else {
                warn!(
                    http.method = %operation.method(),
                    template = operation.template(),
                    "{envelope}"
                );
                outcome.body = render(payload, false);
            }
            return outcome;
        };

        if spec.content().is_empty() {
            outcome.body = render(payload, false);
            return outcome;
        }

        let declared: Vec<(&str, Mime)> = spec
            .content()
            .keys()
            .filter_map(|k| k.parse().ok().map(|m| (k.as_str(), m)))
            .collect();
        let mimes: Vec<Mime> = declared.iter().map(|(_, m)| m.clone()).collect();

        let (media, media_key) = match negotiate(accept, explicit.as_ref(), &mimes) {
            Negotiation::NoMatch => {
                let envelope = GateError::not_acceptable().to_envelope().to_value();
                error!(
                    http.method = %operation.method(),
                    template = operation.template(),
                    accept = accept.unwrap_or_default(),
                    "{envelope}"
                );
                outcome.status = 406;
                outcome.body = Bytes::from(envelope.to_string());
                outcome.verdict = Verdict::NotAcceptable;
                return outcome;
            }
            Negotiation::Matched(media) => {
                outcome.content_type = content_type_header(&media);
                let key = declared.iter().find(|(_, m)| *m == media).map(|(k, _)| *k);
                (media, key)
            }
            Negotiation::DefaultJson => {
                let key = declared.iter().find(|(_, m)| is_json(m)).map(|(k, _)| *k);
                (mime::APPLICATION_JSON, key)
            }
        };

        if !is_json(&media) {
            outcome.body = render(payload, false);
            return outcome;
        }

        let validator = media_key.and_then(|media_type| {
            self.schemas.get(&SchemaKey {
                template: operation.template().to_string(),
                method: operation.method().clone(),
                status: status_key.to_string(),
                media_type: media_type.to_string(),
            })
        });
        let instance = payload.into_json();
        let Some(validator) = validator else {
            debug!(template = operation.template(), status, "no response schema, skipping validation");
            outcome.body = Bytes::from(instance.to_string());
            return outcome;
        };

        let result = validator.validate(&instance);
        if result.valid {
            outcome.body = Bytes::from(instance.to_string());
            outcome.verdict = Verdict::Valid;
            return outcome;
        }

        let rendered = instance.to_string();
        let envelope = GateError::response_validation(result.errors_json(), instance)
            .to_envelope()
            .to_value();

        if self.config.strict {
            error!(
                http.method = %operation.method(),
                template = operation.template(),
                "{envelope}"
            );
            outcome.status = 400;
            outcome.body = Bytes::from(envelope.to_string());
            outcome.verdict = Verdict::Rejected;
        } else {
            warn!(
                http.method = %operation.method(),
                template = operation.template(),
                "{envelope}"
            );
            if rendered.starts_with(MOCK_CONTROLLER_PREFIX) {
                warn!("The used controller might not have been implemented");
            }
            outcome.body = Bytes::from(rendered);
            outcome.verdict = Verdict::Mismatch;
        }
        outcome
    }
}

/// Renders a payload for transmission.
///
/// As JSON, everything is serialized. Otherwise strings and binary data are
/// sent raw and structured values are serialized.
#[must_use]
pub fn render(payload: Payload, as_json: bool) -> Bytes {
    match payload {
        Payload::String(text) if !as_json => Bytes::from(text),
        Payload::Binary(bytes) if !as_json => bytes,
        other => Bytes::from(other.into_json().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn create_test_contract() -> ContractDocument {
        ContractDocument::from_value(json!({
            "paths": {
                "/pets/{id}": {
                    "get": {
                        "responses": {
                            "200": {
                                "description": "A pet",
                                "content": {
                                    "application/json": { "schema": {
                                        "type": "object",
                                        "required": ["id"],
                                        "properties": {
                                            "id": { "type": "integer" },
                                            "tag": { "type": "string", "nullable": true }
                                        }
                                    } },
                                    "text/plain": { "schema": { "type": "string" } }
                                }
                            },
                            "204": { "description": "nothing" },
                            "4XX": {
                                "description": "client error",
                                "content": { "application/json": {} }
                            }
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn create_test_validator(config: ValidationConfig) -> (ContractDocument, ResponseValidator) {
        let contract = create_test_contract();
        let validator = ResponseValidator::from_contract(&contract, config).unwrap();
        (contract, validator)
    }

    fn run(
        validator: &ResponseValidator,
        contract: &ContractDocument,
        status: u16,
        accept: Option<&str>,
        content_type: Option<&str>,
        payload: Payload,
    ) -> ResponseOutcome {
        let operation = contract.operation("/pets/{id}", &Method::GET).unwrap();
        validator.check(ResponseCheck {
            operation,
            status,
            accept,
            content_type,
            payload,
        })
    }

    fn body_json(outcome: &ResponseOutcome) -> Value {
        serde_json::from_slice(&outcome.body).unwrap()
    }

    #[test]
    fn test_compiles_only_json_schemas() {
        let (_, validator) = create_test_validator(ValidationConfig::strict());
        assert_eq!(validator.schema_count(), 1);
    }

    #[test]
    fn test_valid_body_passes() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&validator, &contract, 200, None, None, Payload::from(json!({ "id": 1, "tag": null })));
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.verdict, Verdict::Valid);
        assert_eq!(outcome.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(body_json(&outcome), json!({ "id": 1, "tag": null }));
    }

    #[test]
    fn test_strict_rejects_invalid_body() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&validator, &contract, 200, None, None, Payload::from(json!({})));
        assert_eq!(outcome.status, 400);
        assert_eq!(outcome.verdict, Verdict::Rejected);

        let body = body_json(&outcome);
        assert_eq!(body[0]["message"], "Wrong data in the response. ");
        assert_eq!(body[0]["content"], json!({}));
        let errors = body[0]["error"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0]["message"].as_str().unwrap().contains("id"));
    }

    #[test]
    fn test_lenient_sends_original_body() {
        let (contract, validator) = create_test_validator(ValidationConfig::lenient());
        let outcome = run(&validator, &contract, 200, None, None, Payload::from(json!({})));
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.verdict, Verdict::Mismatch);
        assert_eq!(body_json(&outcome), json!({}));
    }

    #[test]
    fn test_absent_slots_are_stripped_before_validation() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let payload = Payload::object([("id", Payload::from(3)), ("tag", Payload::Absent)]);
        let outcome = run(&validator, &contract, 200, None, None, payload);
        assert_eq!(outcome.verdict, Verdict::Valid);
        assert_eq!(body_json(&outcome), json!({ "id": 3 }));
    }

    #[test]
    fn test_not_acceptable() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&validator, &contract, 200, Some("image/png"), None, Payload::from(json!({ "id": 1 })));
        assert_eq!(outcome.status, 406);
        assert_eq!(outcome.verdict, Verdict::NotAcceptable);
        assert_eq!(body_json(&outcome), json!([{ "message": "No acceptable content type found." }]));
    }

    #[test]
    fn test_negotiated_non_json_passes_through() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&validator, &contract, 200, Some("text/plain"), None, Payload::from("hello"));
        assert_eq!(outcome.verdict, Verdict::PassedThrough);
        assert_eq!(outcome.content_type, "text/plain;charset=utf-8");
        assert_eq!(outcome.body, Bytes::from("hello"));
    }

    #[test]
    fn test_wrong_response_code() {
        let (contract, strict) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&strict, &contract, 500, None, None, Payload::from(json!({ "boom": true })));
        assert_eq!(outcome.status, 500);
        assert_eq!(outcome.verdict, Verdict::WrongCode);
        assert_eq!(body_json(&outcome), json!([{ "message": "Wrong response code: 500" }]));

        let (contract, lenient) = create_test_validator(ValidationConfig::lenient());
        let outcome = run(&lenient, &contract, 500, None, None, Payload::from(json!({ "boom": true })));
        assert_eq!(outcome.verdict, Verdict::WrongCode);
        assert_eq!(body_json(&outcome), json!({ "boom": true }));
    }

    #[test]
    fn test_response_without_content_passes_through() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&validator, &contract, 204, Some("text/html"), None, Payload::Absent);
        assert_eq!(outcome.status, 204);
        assert_eq!(outcome.verdict, Verdict::PassedThrough);
    }

    #[test]
    fn test_class_response_without_schema() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(&validator, &contract, 404, None, None, Payload::from(json!({ "anything": 1 })));
        assert_eq!(outcome.verdict, Verdict::PassedThrough);
        assert_eq!(outcome.status, 404);
    }

    #[test]
    fn test_explicit_content_type_is_kept_without_match() {
        let (contract, validator) = create_test_validator(ValidationConfig::strict());
        let outcome = run(
            &validator,
            &contract,
            200,
            None,
            Some("application/json; charset=latin1"),
            Payload::from(json!({ "id": 1 })),
        );
        assert_eq!(outcome.content_type, "application/json; charset=latin1");
        assert_eq!(outcome.verdict, Verdict::Valid);
    }

    #[test]
    fn test_render() {
        assert_eq!(render(Payload::from("hi"), false), Bytes::from("hi"));
        assert_eq!(render(Payload::from("hi"), true), Bytes::from("\"hi\""));
        assert_eq!(render(Payload::Binary(Bytes::from_static(b"\x00")), false), Bytes::from_static(b"\x00"));
        assert_eq!(render(Payload::from(json!({ "a": 1 })), false), Bytes::from("{\"a\":1}"));
    }

    #[test]
    fn test_invalid_schema_fails_initialization() {
        let contract = ContractDocument::from_value(json!({
            "paths": { "/x": { "get": { "responses": { "200": {
                "description": "bad",
                "content": { "application/json": { "schema": { "type": 12 } } }
            } } } } }
        }))
        .unwrap();
        let err = ResponseValidator::from_contract(&contract, ValidationConfig::strict()).unwrap_err();
        assert!(matches!(err, SentinelError::ResponseSchema { ref path, .. } if path == "/x"));
    }
}
