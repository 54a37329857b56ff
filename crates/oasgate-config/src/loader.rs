//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, GatewayConfig, LogFormat};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones key by key:
/// 1. Default values or a preset
/// 2. Configuration file (TOML or JSON)
/// 3. `.env` file
/// 4. Environment variables (`PREFIX__SECTION__KEY`)
///
/// # Example
///
/// ```no_run
/// use oasgate_config::ConfigLoader;
///
/// # fn main() -> Result<(), oasgate_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("gateway.toml")?
///     .with_dotenv()?
///     .with_env_prefix("OASGATE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: GatewayConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = GatewayConfig::default();
        self
    }

    /// Start with development preset configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use oasgate_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = GatewayConfig::development();
        self
    }

    /// Start with production preset configuration.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = GatewayConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats, picked by extension.
    /// Keys present in the file override the current values; absent keys
    /// keep them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(format @ ("toml" | "json")) => self.with_string(&content, format),
            _ => Err(ConfigError::unsupported_format(path.display().to_string())),
        }
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `toml` or `json` format.
    ///
    /// # Example
    ///
    /// ```
    /// use oasgate_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [validator]
    ///     strict = true
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.validator.strict);
    /// assert!(config.validator.enabled);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                let table: toml::Value = toml::from_str(content)?;
                serde_json::to_value(table)?
            }
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };

        self.merge_layer(layer)?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`, for
    /// example `OASGATE__VALIDATOR__STRICT=true`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the working directory or its parents.
    ///
    /// A missing file is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    pub fn load(mut self) -> Result<GatewayConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars().collect();
            self.apply_env_vars(&prefix, vars)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> GatewayConfig {
        self.config
    }

    // Deep-merge a parsed layer over the current configuration
    fn merge_layer(&mut self, layer: Value) -> Result<(), ConfigError> {
        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, layer);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    fn apply_env_vars(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if key.starts_with(&marker) {
                self.apply_env_var(&key, &value, prefix)?;
            }
        }
        Ok(())
    }

    // Apply a single environment variable
    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_var(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let flag = || parse_bool(value).ok_or_else(|| ConfigError::env_var(key, "expected boolean"));

        match parts.as_slice() {
            // Router section
            ["ROUTER", "ENABLED"] => self.config.router.enabled = flag()?,
            ["ROUTER", "CHECK_CONTROLLERS"] => self.config.router.check_controllers = flag()?,

            // Validator section
            ["VALIDATOR", "ENABLED"] => self.config.validator.enabled = flag()?,
            ["VALIDATOR", "STRICT"] => self.config.validator.strict = flag()?,
            ["VALIDATOR", "IGNORE_UNKNOWN_FORMATS"] => {
                self.config.validator.ignore_unknown_formats = flag()?;
            }
            ["VALIDATOR", "REQUESTS"] => self.config.validator.requests = flag()?,

            // Security section
            ["SECURITY", "OAS_SECURITY"] => self.config.security.oas_security = flag()?,
            ["SECURITY", "OAS_AUTH"] => self.config.security.oas_auth = flag()?,

            // Docs section
            ["DOCS", "API_DOCS"] => {
                self.config.docs.api_docs = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["DOCS", "API_DOCS_PREFIX"] => self.config.docs.api_docs_prefix = value.to_string(),

            // Logging section
            ["LOGGING", "ENABLED"] => self.config.logging.enabled = flag()?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_var(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => self.config.logging.ansi_enabled = flag()?,
            ["LOGGING", "INCLUDE_LOCATION"] => self.config.logging.include_location = flag()?,
            ["LOGGING", "LOG_FILE"] => {
                self.config.logging.log_file = if value.is_empty() {
                    None
                } else {
                    Some(value.into())
                };
            }

            // Unknown key - ignore
            _ => {}
        }

        Ok(())
    }
}

/// Objects merge key by key; any other value replaces.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validator.strict);
    }

    #[test]
    fn test_file_layer_keeps_preset_values() {
        let toml = r#"
            [logging]
            level = "warn"
        "#;

        let config = ConfigLoader::new()
            .with_development()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.include_location);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"security": {"oas_security": true, "security_files": {"bearerAuth": {"secret": "s"}}}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.security.oas_security);
        assert_eq!(config.security.security_files["bearerAuth"], json!({ "secret": "s" }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ConfigLoader::new().with_string("[router]\ncheck_controler = true", "toml");
        assert!(result.is_err());

        let result = ConfigLoader::new().with_string(r#"{"server": {}}"#, "json");
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: b", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        fs::write(&path, "[docs]\napi_docs = \"/openapi.json\"\n").unwrap();

        let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
        assert_eq!(config.docs.endpoint().as_deref(), Some("/openapi.json"));

        let yaml = dir.path().join("gateway.yaml");
        fs::write(&yaml, "docs: {}").unwrap();
        assert!(ConfigLoader::new().with_file(&yaml).is_err());
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/gateway.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/gateway.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_dotenv_file_missing() {
        let result = ConfigLoader::new().with_dotenv_file("/nonexistent/.env");
        assert!(matches!(result, Err(ConfigError::Dotenv(_))));
    }

    #[test]
    fn test_load_rejects_invalid_level() {
        let result = ConfigLoader::new()
            .with_string(r#"{"logging": {"level": "loud"}}"#, "json")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_apply_env_vars() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_vars(
                "TEST",
                create_test_vars(&[
                    ("TEST__VALIDATOR__STRICT", "true"),
                    ("TEST__VALIDATOR__REQUESTS", "false"),
                    ("TEST__SECURITY__OAS_AUTH", "yes"),
                    ("TEST__LOGGING__FORMAT", "pretty"),
                    ("TEST__LOGGING__LOG_FILE", "/var/log/oasgate.log"),
                    ("TEST__DOCS__API_DOCS", ""),
                    ("OTHER__VALIDATOR__STRICT", "false"),
                    ("TEST__UNKNOWN__KEY", "ignored"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert!(config.validator.strict);
        assert!(!config.validator.requests);
        assert!(config.security.oas_auth);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.log_file, Some("/var/log/oasgate.log".into()));
        assert!(config.docs.api_docs.is_none());
    }

    #[test]
    fn test_apply_env_var_invalid_boolean() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__ROUTER__ENABLED", "sometimes", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvVar { .. })));
    }

    #[test]
    fn test_merge_values() {
        let mut base = json!({ "a": { "b": 1, "c": 2 }, "d": [1] });
        merge_values(&mut base, json!({ "a": { "c": 3 }, "d": [2, 3], "e": null }));
        assert_eq!(base, json!({ "a": { "b": 1, "c": 3 }, "d": [2, 3], "e": null }));
    }
}
