//! Typed configuration for the oasgate gateway.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! The configuration system is built around the [`GatewayConfig`] struct:
//!
//! - [`RouterSection`] - Controller dispatch and startup checks
//! - [`ValidatorSection`] - Request and response validation against the contract
//! - [`SecuritySection`] - Authentication and grant sources
//! - [`DocsSection`] - Contract documentation endpoint
//! - [`LoggingSection`] - Log level, format and destination
//!
//! # Example
//!
//! ```no_run
//! use oasgate_config::ConfigLoader;
//!
//! # fn main() -> Result<(), oasgate_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("gateway.toml")?
//!     .with_env_prefix("OASGATE")
//!     .load()?;
//!
//! println!("strict validation: {}", config.validator.strict);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [router]
//! enabled = true
//! check_controllers = true
//!
//! [validator]
//! strict = false
//! requests = true
//!
//! [security]
//! oas_security = true
//! oas_auth = true
//!
//! [security.security_files]
//! bearerAuth = "config/bearer.json"
//!
//! [security.grants_files]
//! bearerAuth = "https://config.example.com/grants.json"
//!
//! [docs]
//! api_docs = "/api-docs"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variables
//!
//! Any leaf value can be overridden with `PREFIX__SECTION__KEY`:
//!
//! ```bash
//! OASGATE__VALIDATOR__STRICT=true
//! OASGATE__LOGGING__LEVEL=debug
//! OASGATE__DOCS__API_DOCS=/openapi.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use oasgate_telemetry::LogFormat;
pub use schema::*;
