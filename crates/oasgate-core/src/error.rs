//! Error types for oasgate.
//!
//! Two families live here:
//!
//! - [`CoreError`] is raised while a contract is loaded. Every variant is
//!   initialization-fatal and names the path, method or scheme at fault.
//! - [`GateError`] is the per-request error. It is classified by
//!   [`ErrorCategory`], which decides the HTTP status, and renders to the
//!   array-shaped [`ErrorEnvelope`] that clients receive.
//!
//! # Envelope Shape
//!
//! ```text
//! [
//!   {
//!     "message": "Wrong data in the response. ",
//!     "error":   [ ... validator errors ... ],   (optional)
//!     "content": { ... offending body ... }      (optional)
//!   }
//! ]
//! ```

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type alias using [`GateError`].
pub type GateResult<T> = Result<T, GateError>;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors found while loading a contract document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The document root is not a JSON object.
    #[error("contract document must be a JSON object")]
    NotAnObject,

    /// The document has no `paths` object.
    #[error("contract document must have a `paths` object")]
    MissingPaths,

    /// A path item is not an object.
    #[error("path item `{path}` must be an object")]
    InvalidPathItem {
        /// The offending path template.
        path: String,
    },

    /// An operation is not an object.
    #[error("operation {method} {path} must be an object")]
    InvalidOperation {
        /// The path template.
        path: String,
        /// The HTTP method, uppercase.
        method: String,
    },

    /// An operation field has the wrong shape.
    #[error("field `{field}` of operation {method} {path} is malformed")]
    InvalidField {
        /// The path template.
        path: String,
        /// The HTTP method, uppercase.
        method: String,
        /// The field name.
        field: String,
    },

    /// A security scheme is not an object or lacks `type`.
    #[error("security scheme `{name}` is malformed")]
    InvalidSecurityScheme {
        /// The scheme name under `components.securitySchemes`.
        name: String,
    },

    /// `servers` is not an array of objects with a string `url`.
    #[error("`servers` must be an array of objects with a `url`")]
    InvalidServers,

    /// The document does not conform to the OpenAPI 3.0 schema.
    #[error("contract does not conform to OpenAPI 3.0: {}", errors.join("; "))]
    SchemaViolation {
        /// One entry per violation, `<instance path>: <message>`.
        errors: Vec<String>,
    },
}

/// Categories of request errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request or response did not conform to the contract.
    Validation,
    /// Missing or invalid credentials.
    Authentication,
    /// The principal may not perform the operation.
    Authorization,
    /// No contract operation matches the request.
    NotFound,
    /// No declared content type is acceptable to the client.
    NotAcceptable,
    /// Handler failure or no response sent.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard request-level error for oasgate.
///
/// # Example
///
/// ```
/// use oasgate_core::{GateError, ErrorCategory};
/// use http::StatusCode;
///
/// let error = GateError::not_acceptable();
/// assert_eq!(error.category(), ErrorCategory::NotAcceptable);
/// assert_eq!(error.status_code(), StatusCode::NOT_ACCEPTABLE);
/// ```
#[derive(Error, Debug)]
pub enum GateError {
    /// The response body failed schema validation.
    #[error("Response validation failed: {message}")]
    ResponseValidation {
        /// Human-readable error message.
        message: String,
        /// Validator errors, one JSON object each.
        errors: Vec<Value>,
        /// The offending response body.
        content: Value,
    },

    /// The request failed parameter or body validation.
    #[error("Request validation failed: {message}")]
    RequestValidation {
        /// Human-readable error message.
        message: String,
        /// Validator errors, one JSON object each.
        errors: Vec<Value>,
    },

    /// Authentication failed.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("Authorization denied: {message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
        /// The handler id of the denied operation.
        operation_id: Option<String>,
    },

    /// No operation matches.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// Content negotiation failed.
    #[error("Not acceptable: {message}")]
    NotAcceptable {
        /// Human-readable error message.
        message: String,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl GateError {
    /// Message used when a response body fails validation.
    pub const WRONG_DATA: &'static str = "Wrong data in the response. ";

    /// Message used when a request fails validation.
    pub const WRONG_REQUEST: &'static str = "Wrong data in the request. ";

    /// Message used when no declared content type is acceptable.
    pub const NO_ACCEPTABLE_TYPE: &'static str = "No acceptable content type found.";

    /// Creates a response validation error.
    #[must_use]
    pub fn response_validation(errors: Vec<Value>, content: Value) -> Self {
        Self::ResponseValidation {
            message: Self::WRONG_DATA.to_string(),
            errors,
            content,
        }
    }

    /// Creates a request validation error.
    #[must_use]
    pub fn request_validation(errors: Vec<Value>) -> Self {
        Self::RequestValidation {
            message: Self::WRONG_REQUEST.to_string(),
            errors,
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            operation_id: None,
        }
    }

    /// Creates an authorization error with operation context.
    #[must_use]
    pub fn authorization_for_operation(
        message: impl Into<String>,
        operation_id: impl Into<String>,
    ) -> Self {
        Self::Authorization {
            message: message.into(),
            operation_id: Some(operation_id.into()),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates the content negotiation error.
    #[must_use]
    pub fn not_acceptable() -> Self {
        Self::NotAcceptable {
            message: Self::NO_ACCEPTABLE_TYPE.to_string(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ResponseValidation { .. } | Self::RequestValidation { .. } => {
                ErrorCategory::Validation
            }
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::NotAcceptable { .. } => ErrorCategory::NotAcceptable,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the client-facing message, without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::ResponseValidation { message, .. }
            | Self::RequestValidation { message, .. }
            | Self::Authentication { message }
            | Self::Authorization { message, .. }
            | Self::NotFound { message }
            | Self::NotAcceptable { message }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Converts this error to the array-shaped response body.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let entry = match self {
            Self::ResponseValidation {
                message,
                errors,
                content,
            } => ErrorEntry {
                message: message.clone(),
                error: Some(Value::Array(errors.clone())),
                content: Some(content.clone()),
            },
            Self::RequestValidation { message, errors } => ErrorEntry {
                message: message.clone(),
                error: Some(Value::Array(errors.clone())),
                content: None,
            },
            other => ErrorEntry::message(other.message()),
        };
        ErrorEnvelope::single(entry)
    }
}

/// Serializable array error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorEnvelope(pub Vec<ErrorEntry>);

impl ErrorEnvelope {
    /// Creates an envelope with one entry.
    #[must_use]
    pub fn single(entry: ErrorEntry) -> Self {
        Self(vec![entry])
    }

    /// Creates an envelope holding only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::single(ErrorEntry::message(message))
    }

    /// Renders the envelope as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(ErrorEntry::to_value).collect())
    }
}

/// One element of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable error message.
    pub message: String,
    /// Structured error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// The content that caused the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl ErrorEntry {
    /// Creates an entry holding only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            content: None,
        }
    }

    fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(error) = &self.error {
            map.insert("error".to_string(), error.clone());
        }
        if let Some(content) = &self.content {
            map.insert("content".to_string(), content.clone());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_validation_error() {
        let error = GateError::response_validation(
            vec![json!({"message": "\"id\" is a required property"})],
            json!({}),
        );
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);

        assert_eq!(
            error.to_envelope().to_value(),
            json!([{
                "message": "Wrong data in the response. ",
                "error": [{"message": "\"id\" is a required property"}],
                "content": {}
            }])
        );
    }

    #[test]
    fn test_request_validation_error() {
        let error = GateError::request_validation(vec![
            json!({"message": "Missing parameter limit in query"}),
        ]);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error.to_envelope().to_value(),
            json!([{
                "message": "Wrong data in the request. ",
                "error": [{"message": "Missing parameter limit in query"}]
            }])
        );
    }

    #[test]
    fn test_schema_violation_lists_errors() {
        let err = CoreError::SchemaViolation {
            errors: vec!["/info: required".to_string(), "/openapi: pattern".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "contract does not conform to OpenAPI 3.0: /info: required; /openapi: pattern"
        );
    }

    #[test]
    fn test_not_acceptable_envelope() {
        let error = GateError::not_acceptable();
        assert_eq!(
            error.to_envelope().to_value(),
            json!([{"message": "No acceptable content type found."}])
        );
    }

    #[test]
    fn test_authorization_error() {
        let error = GateError::authorization_for_operation("Access denied", "deletePet");
        assert_eq!(error.category(), ErrorCategory::Authorization);
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.message(), "Access denied");
        assert!(error.to_string().contains("Access denied"));
    }

    #[test]
    fn test_internal_error_hides_source() {
        let error = GateError::internal_with_source("handler failed", anyhow::anyhow!("db down"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_string(&error.to_envelope()).expect("serialization should work");
        assert!(!body.contains("db down"));
    }

    #[test]
    fn test_envelope_serialization_matches_to_value() {
        let envelope = GateError::not_found("Cannot GET /nowhere").to_envelope();
        let serialized = serde_json::to_value(&envelope).expect("serialization should work");
        assert_eq!(serialized, envelope.to_value());
        assert_eq!(serialized, json!([{"message": "Cannot GET /nowhere"}]));
    }

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::Validation,
            ErrorCategory::Authentication,
            ErrorCategory::Authorization,
            ErrorCategory::NotFound,
            ErrorCategory::NotAcceptable,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }

    #[test]
    fn test_core_error_names_location() {
        let error = CoreError::InvalidOperation {
            path: "/pets/{id}".to_string(),
            method: "GET".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("/pets/{id}"));
        assert!(text.contains("GET"));
    }
}
