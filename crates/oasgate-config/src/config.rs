//! Main configuration types.
//!
//! This module provides the top-level [`GatewayConfig`] struct and its builder.

use oasgate_telemetry::{is_known_level, LogFormat};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DocsSection, LoggingSection, RouterSection, SecuritySection, ValidatorSection};

/// Complete oasgate configuration.
///
/// This is the root configuration type that contains all configuration sections.
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use oasgate_config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert!(config.router.check_controllers);
/// assert!(!config.validator.strict);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Routing and controller checks.
    #[serde(default)]
    pub router: RouterSection,

    /// Response validation.
    #[serde(default)]
    pub validator: ValidatorSection,

    /// Authentication and authorization.
    #[serde(default)]
    pub security: SecuritySection,

    /// Contract documentation endpoint.
    #[serde(default)]
    pub docs: DocsSection,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl GatewayConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the log level is not one of `off error warn info debug trace`
    /// - the docs path or prefix does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_known_level(&self.logging.level) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("unknown log level: {}", self.logging.level),
            ));
        }

        if let Some(docs) = &self.docs.api_docs {
            if !docs.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "docs.api_docs",
                    format!("must start with '/': {docs}"),
                ));
            }
        }

        let prefix = &self.docs.api_docs_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "docs.api_docs_prefix",
                format!("must be empty or start with '/': {prefix}"),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty log formatting with ANSI colors
    /// - Debug log level
    /// - Lenient response validation
    ///
    /// # Example
    ///
    /// ```
    /// use oasgate_config::GatewayConfig;
    ///
    /// let config = GatewayConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.validator.strict = false;

        config
    }

    /// Create a production configuration preset.
    ///
    /// - JSON log formatting
    /// - Info log level
    /// - Strict response validation
    /// - Authentication and authorization enabled
    ///
    /// # Example
    ///
    /// ```
    /// use oasgate_config::GatewayConfig;
    ///
    /// let config = GatewayConfig::production();
    /// assert_eq!(config.logging.format, oasgate_config::LogFormat::Json);
    /// assert!(config.validator.strict);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.validator.strict = true;

        config.security.oas_security = true;
        config.security.oas_auth = true;

        config
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    router: Option<RouterSection>,
    validator: Option<ValidatorSection>,
    security: Option<SecuritySection>,
    docs: Option<DocsSection>,
    logging: Option<LoggingSection>,
}

impl GatewayConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the router section.
    #[must_use]
    pub fn router(mut self, router: RouterSection) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the validator section.
    #[must_use]
    pub fn validator(mut self, validator: ValidatorSection) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set the security section.
    #[must_use]
    pub fn security(mut self, security: SecuritySection) -> Self {
        self.security = Some(security);
        self
    }

    /// Set the docs section.
    #[must_use]
    pub fn docs(mut self, docs: DocsSection) -> Self {
        self.docs = Some(docs);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSection) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> GatewayConfig {
        GatewayConfig {
            router: self.router.unwrap_or_default(),
            validator: self.validator.unwrap_or_default(),
            security: self.security.unwrap_or_default(),
            docs: self.docs.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<GatewayConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
