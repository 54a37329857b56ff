//! Sentinel error types.

use thiserror::Error;

/// Result type for Sentinel operations.
pub type SentinelResult<T> = Result<T, SentinelError>;

/// Errors raised while preparing request or response validation.
///
/// All of these surface during initialization; validating a request or response never
/// fails, it only produces a [`ValidationResult`](crate::ValidationResult).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SentinelError {
    /// A schema could not be compiled.
    #[error("failed to compile schema: {reason}")]
    SchemaCompile {
        /// Compiler message.
        reason: String,
    },

    /// A response schema in the contract could not be compiled.
    #[error("invalid schema for {method} {path} response {status} ({media_type}): {reason}")]
    ResponseSchema {
        /// HTTP method.
        method: String,
        /// Path template.
        path: String,
        /// Response key (`200`, `2XX`, `default`).
        status: String,
        /// Media type the schema is declared under.
        media_type: String,
        /// Compiler message.
        reason: String,
    },

    /// A request parameter or body schema could not be compiled.
    #[error("invalid schema for {method} {path} {target}: {reason}")]
    RequestSchema {
        /// HTTP method.
        method: String,
        /// Path template.
        path: String,
        /// `parameter <name> in <location>` or `request body (<media type>)`.
        target: String,
        /// Compiler message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_schema_display() {
        let err = SentinelError::ResponseSchema {
            method: "GET".to_string(),
            path: "/pets/{id}".to_string(),
            status: "200".to_string(),
            media_type: "application/json".to_string(),
            reason: "bad type".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("GET /pets/{id}"));
        assert!(text.contains("200"));
        assert!(text.contains("bad type"));
    }
}
