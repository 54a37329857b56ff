//! Telemetry error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The log file could not be opened.
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        /// The configured log file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
