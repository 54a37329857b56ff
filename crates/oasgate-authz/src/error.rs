//! Error types for the authorization crate.

use oasgate_core::GateError;
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors that can occur while loading security sources or checking a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// The grant table is not a JSON object.
    #[error("invalid grant table for scheme {scheme}: expected an object")]
    InvalidGrantTable {
        /// Security scheme the table belongs to.
        scheme: String,
    },

    /// A role entry in the grant table is not an object.
    #[error("invalid grants for role {role}: expected an object of resources")]
    InvalidRole {
        /// Role name.
        role: String,
    },

    /// A source could not be fetched or read.
    #[error("failed to load {location}: {message}")]
    SourceLoad {
        /// URL or path of the source.
        location: String,
        /// Error message.
        message: String,
    },

    /// A source was read but is not valid JSON.
    #[error("failed to parse {location}: {message}")]
    SourceParse {
        /// URL or path of the source.
        location: String,
        /// Error message.
        message: String,
    },

    /// A configured source names a scheme the contract does not declare.
    #[error("unknown security scheme: {name}")]
    UnknownScheme {
        /// Scheme name.
        name: String,
    },

    /// A bearer configuration cannot be turned into a verifier.
    #[error("invalid bearer configuration for scheme {scheme}: {message}")]
    BearerConfig {
        /// Scheme name.
        scheme: String,
        /// Error message.
        message: String,
    },

    /// The request carries no usable credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Access denied by the grant table.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Reason for denial.
        reason: String,
    },
}

impl AuthzError {
    /// Create a source load error.
    pub fn source_load(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceLoad {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a source parse error.
    pub fn source_parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceParse {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an authentication failure.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    /// Create an access denied error.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Check if this is an access denied error.
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Check if this error is raised while serving a request rather than at startup.
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::Unauthenticated(_) | Self::AccessDenied { .. })
    }

    /// Converts to the request-level error answered to the client.
    pub fn to_gate_error(&self) -> GateError {
        match self {
            Self::Unauthenticated(message) => GateError::authentication(message.clone()),
            Self::AccessDenied { reason } => GateError::authorization(reason.clone()),
            other => GateError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_role_names_role() {
        let err = AuthzError::InvalidRole {
            role: "admin".to_string(),
        };
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_access_denied_error() {
        let err = AuthzError::access_denied("insufficient permissions");
        assert!(err.is_access_denied());
        assert!(err.is_request_error());
        assert!(err.to_string().contains("insufficient permissions"));
    }

    #[test]
    fn test_to_gate_error_status() {
        assert_eq!(
            AuthzError::unauthenticated("no token").to_gate_error().status_code().as_u16(),
            401
        );
        assert_eq!(
            AuthzError::access_denied("nope").to_gate_error().status_code().as_u16(),
            403
        );
        assert_eq!(
            AuthzError::source_load("/tmp/x.json", "missing")
                .to_gate_error()
                .status_code()
                .as_u16(),
            500
        );
    }

    #[test]
    fn test_error_display() {
        let err = AuthzError::source_load("https://acl.example.com/grants.json", "timeout");
        assert_eq!(
            err.to_string(),
            "failed to load https://acl.example.com/grants.json: timeout"
        );
    }
}
