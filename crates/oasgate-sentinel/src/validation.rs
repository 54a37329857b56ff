//! Compiled response schemas.
//!
//! This module wraps the `jsonschema` crate. Schemas are prepared with
//! [`prepare_schema`](crate::prepare_schema) and compiled once, using the
//! Draft 4 dialect that OpenAPI 3.0 schemas are written in.

use std::fmt;

use serde_json::{json, Value};

use crate::error::{SentinelError, SentinelResult};

/// Result of a validation operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub valid: bool,
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a successful validation result.
    #[must_use]
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: vec![],
        }
    }

    /// Create a failed validation result.
    #[must_use]
    pub fn failure(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Renders the errors as JSON objects for an error envelope.
    #[must_use]
    pub fn errors_json(&self) -> Vec<Value> {
        self.errors.iter().map(ValidationError::to_json).collect()
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON pointer to the offending instance location.
    pub instance_path: String,
    /// JSON pointer to the failing schema keyword.
    pub schema_path: String,
    /// Error message.
    pub message: String,
}

impl ValidationError {
    /// Renders the error as `{"message", "path", "schemaPath"}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "message": self.message,
            "path": self.instance_path,
            "schemaPath": self.schema_path,
        })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// A compiled schema.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compiles an already prepared schema.
    ///
    /// When `ignore_unknown_formats` is false, a `format` the validator does
    /// not know is a compile error.
    pub fn compile(prepared: &Value, ignore_unknown_formats: bool) -> SentinelResult<Self> {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft4);
        opts.should_ignore_unknown_formats(ignore_unknown_formats);

        let validator = opts
            .build(prepared)
            .map_err(|e| SentinelError::SchemaCompile {
                reason: e.to_string(),
            })?;
        Ok(Self { validator })
    }

    /// Validates an instance, collecting every error.
    #[must_use]
    pub fn validate(&self, instance: &Value) -> ValidationResult {
        let errors: Vec<ValidationError> = self
            .validator
            .iter_errors(instance)
            .map(|e| ValidationError {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            ValidationResult::success()
        } else {
            ValidationResult::failure(errors)
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}
