//! Contract document checks against the OpenAPI 3.0 schema.
//!
//! The schema ships with the crate under `schemas/openapi-3.0.json`. It is
//! written in Draft 4 and uses formats (`uri-reference`, `regex`) that are
//! not checked, so unknown formats are always ignored here.

use serde_json::Value;

use crate::error::{SentinelError, SentinelResult};
use crate::validation::{SchemaValidator, ValidationResult};

const OPENAPI_3_0_SCHEMA: &str = include_str!("../schemas/openapi-3.0.json");

/// Validates a raw contract document against the OpenAPI 3.0 schema.
///
/// ```
/// use oasgate_sentinel::check_contract;
/// use serde_json::json;
///
/// let result = check_contract(&json!({
///     "openapi": "3.0.3",
///     "info": { "title": "Pets", "version": "1.0.0" },
///     "paths": {}
/// }))
/// .unwrap();
/// assert!(result.valid);
///
/// let result = check_contract(&json!({ "openapi": "3.0.3", "paths": {} })).unwrap();
/// assert!(!result.valid);
/// ```
pub fn check_contract(document: &Value) -> SentinelResult<ValidationResult> {
    let schema: Value = serde_json::from_str(OPENAPI_3_0_SCHEMA).map_err(|e| SentinelError::SchemaCompile {
        reason: format!("bundled OpenAPI schema: {e}"),
    })?;
    let validator = SchemaValidator::compile(&schema, true)?;
    Ok(validator.validate(document))
}
