//! Structured logging setup.
//!
//! # Features
//!
//! - JSON or human-readable output
//! - Configurable level through an `EnvFilter`
//! - Optional append-only log file instead of stdout

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Levels accepted by [`LogConfig::level`].
const KNOWN_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Log level (e.g., "info", "debug", "warn").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to colorize pretty output on a terminal.
    pub ansi_enabled: bool,

    /// Whether to include file/line info.
    pub include_location: bool,

    /// Append logs to this file instead of stdout.
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            ansi_enabled: false,
            include_location: false,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: true,
            include_location: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Returns true if `level` is one of `off error warn info debug trace`.
#[must_use]
pub fn is_known_level(level: &str) -> bool {
    KNOWN_LEVELS.contains(&level.to_ascii_lowercase().as_str())
}

/// Initializes the logging subsystem.
///
/// Does nothing when `config.enabled` is false.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` for a bad level or a second
/// initialization, and `TelemetryError::LogFile` if the file cannot be opened.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let writer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };
    let ansi = config.ansi_enabled && config.log_file.is_none();

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// Standard log fields for oasgate.
///
/// Use these field names for consistency across logs.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// Operation (handler) ID field name.
    pub const OPERATION_ID: &str = "operation_id";

    /// Contract path template field name.
    pub const TEMPLATE: &str = "template";

    /// HTTP method field name.
    pub const HTTP_METHOD: &str = "http.method";

    /// HTTP path field name.
    pub const HTTP_PATH: &str = "http.path";

    /// HTTP status code field name.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Controller name field name.
    pub const CONTROLLER: &str = "controller";

    /// Security scheme field name.
    pub const SCHEME: &str = "scheme";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Error field name.
    pub const ERROR: &str = "error";
}

/// Logs a request start event.
#[macro_export]
macro_rules! log_request_start {
    ($request_id:expr, $method:expr, $path:expr) => {
        tracing::debug!(
            request_id = %$request_id,
            http.method = %$method,
            http.path = %$path,
            "Request started"
        );
    };
}

/// Logs a request completion event.
#[macro_export]
macro_rules! log_request_complete {
    ($request_id:expr, $status:expr, $duration_ms:expr) => {
        tracing::info!(
            request_id = %$request_id,
            http.status_code = $status,
            duration_ms = $duration_ms,
            "Request completed"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.include_location);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_known_levels() {
        assert!(is_known_level("info"));
        assert!(is_known_level("WARN"));
        assert!(!is_known_level("verbose"));
    }

    #[test]
    fn test_field_names() {
        assert_eq!(fields::REQUEST_ID, "request_id");
        assert_eq!(fields::OPERATION_ID, "operation_id");
        assert_eq!(fields::HTTP_STATUS, "http.status_code");
    }

    #[test]
    fn test_create_env_filter_valid() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("oasgate_sentinel=debug,warn").is_ok());
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            log_file: Some(dir.path().join("missing").join("app.log")),
            ..Default::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::LogFile { .. })
        ));
    }
}
