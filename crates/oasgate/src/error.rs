//! Gateway errors.

use oasgate_authz::AuthzError;
use oasgate_config::ConfigError;
use oasgate_core::CoreError;
use oasgate_middleware::DispatchError;
use oasgate_sentinel::SentinelError;
use oasgate_telemetry::TelemetryError;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised while building or serving a gateway.
///
/// Every variant except [`GatewayError::Io`] is fatal at initialization.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The contract document has the wrong shape.
    #[error("invalid contract: {0}")]
    Contract(#[from] CoreError),

    /// A request or response schema could not be compiled.
    #[error("validator setup failed: {0}")]
    Validator(#[from] SentinelError),

    /// Security sources or verifiers could not be set up.
    #[error("security setup failed: {0}")]
    Security(#[from] AuthzError),

    /// An operation has no controller or handler.
    #[error("controller check failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error("logging setup failed: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Listener I/O failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_names_operation() {
        let err: GatewayError = DispatchError::ControllerNotFound {
            path: "/pets/{id}".to_string(),
            method: "GET".to_string(),
            attempted: vec!["PetsController".to_string(), "Default".to_string()],
        }
        .into();
        let message = err.to_string();
        assert!(message.starts_with("controller check failed"));
        assert!(message.contains("/pets/{id}"));
        assert!(message.contains("GET"));
    }

    #[test]
    fn test_contract_error() {
        let err = GatewayError::from(CoreError::MissingPaths);
        assert!(err.to_string().starts_with("invalid contract"));
    }
}
