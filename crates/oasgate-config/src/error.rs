//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while layering or validating a [`GatewayConfig`](crate::GatewayConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file is missing.
    #[error("configuration file not found: {}", path.display())]
    FileNotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// A config file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The layer is neither TOML nor JSON.
    #[error("unsupported configuration format `{format}` (expected toml or json)")]
    UnsupportedFormat {
        /// Format name or file the loader was given.
        format: String,
    },

    /// A TOML layer did not parse.
    #[error("invalid TOML layer: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON layer did not parse, or the merged layers do not fit the
    /// config schema (unknown section or key, wrong type).
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The `.env` file exists but is malformed.
    #[error("cannot load .env: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A `PREFIX__SECTION__KEY` override has a value of the wrong shape.
    #[error("environment override {var}: {reason}")]
    EnvVar {
        /// Full variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A loaded value fails [`GatewayConfig::validate`](crate::GatewayConfig::validate).
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field, e.g. `docs.api_docs`.
        field: String,
        /// Why it was refused.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub(crate) fn env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// A validation failure on `field`.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_names_path() {
        let err = ConfigError::file_not_found("/etc/oasgate/gateway.toml");
        assert_eq!(
            err.to_string(),
            "configuration file not found: /etc/oasgate/gateway.toml"
        );
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = ConfigError::invalid_value("logging.level", "unknown log level: loud");
        assert_eq!(err.to_string(), "logging.level: unknown log level: loud");
    }

    #[test]
    fn test_env_var_names_variable() {
        let err = ConfigError::env_var("OASGATE__VALIDATOR__STRICT", "expected boolean");
        assert_eq!(
            err.to_string(),
            "environment override OASGATE__VALIDATOR__STRICT: expected boolean"
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigError::unsupported_format("yaml");
        assert!(err.to_string().contains("`yaml`"));
    }
}
