//! Structured logging for oasgate.
//!
//! The library crates only emit `tracing` events. Binaries that want them
//! on stdout or in a file call [`init_logging`] once at startup:
//!
//! ```text
//!   oasgate-* crates ── tracing::info!/warn!/error! ──┐
//!                                                     ▼
//!                              ┌───────────────────────────────────┐
//!                              │ registry                          │
//!                              │   EnvFilter (level)               │
//!                              │   fmt layer (json | pretty)       │
//!                              └─────────────┬─────────────────────┘
//!                                            ▼
//!                                  stdout  or  log_file
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use oasgate_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(operation_id = "listPets", "Register: GET - /pets");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, is_known_level, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
