//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use std::path::PathBuf;

use indexmap::IndexMap;
use oasgate_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Router configuration section.
///
/// # Example
///
/// ```
/// use oasgate_config::RouterSection;
///
/// let config = RouterSection::default();
/// assert!(config.enabled);
/// assert!(config.check_controllers);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    /// Dispatch matched requests to controllers.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fail startup when an operation has no controller or handler.
    #[serde(default = "default_true")]
    pub check_controllers: bool,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            enabled: true,
            check_controllers: true,
        }
    }
}

/// Request and response validation section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidatorSection {
    /// Validate responses against the contract.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replace non-conforming responses with a 400 instead of warning.
    #[serde(default)]
    pub strict: bool,

    /// Accept schema `format` values the validator does not know.
    #[serde(default = "default_true")]
    pub ignore_unknown_formats: bool,

    /// Check request parameters and bodies before dispatch.
    #[serde(default = "default_true")]
    pub requests: bool,
}

impl Default for ValidatorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: false,
            ignore_unknown_formats: true,
            requests: true,
        }
    }
}

/// Security configuration section.
///
/// Sources are either inline JSON objects or strings naming a URL, an
/// absolute path, or a path relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SecuritySection {
    /// Authenticate requests to operations that declare security.
    #[serde(default)]
    pub oas_security: bool,

    /// Authorize authenticated requests against the grant tables.
    #[serde(default)]
    pub oas_auth: bool,

    /// Bearer configuration source per scheme name.
    #[serde(default)]
    pub security_files: IndexMap<String, Value>,

    /// Grant table source per scheme name.
    #[serde(default)]
    pub grants_files: IndexMap<String, Value>,
}

/// Documentation endpoint section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsSection {
    /// Path of the JSON contract endpoint; `None` disables it.
    #[serde(default = "default_api_docs")]
    pub api_docs: Option<String>,

    /// Prefix prepended to `api_docs`.
    #[serde(default)]
    pub api_docs_prefix: String,
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            api_docs: default_api_docs(),
            api_docs_prefix: String::new(),
        }
    }
}

impl DocsSection {
    /// The full path the contract is served under, if enabled.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        self.api_docs
            .as_ref()
            .map(|docs| format!("{}{}", self.api_docs_prefix, docs))
    }
}

#[allow(clippy::unnecessary_wraps)]
fn default_api_docs() -> Option<String> {
    Some("/api-docs".to_string())
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (e.g., "info", "debug", "warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Enable ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include file and line in log events.
    #[serde(default)]
    pub include_location: bool,

    /// Append logs to this file instead of stdout.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
            log_file: None,
        }
    }
}

impl LoggingSection {
    /// Converts to the logging setup configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ansi_enabled: self.ansi_enabled,
            include_location: self.include_location,
            log_file: self.log_file.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
