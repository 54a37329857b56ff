//! # oasgate
//!
//! **Contract-driven HTTP routing and response validation**
//!
//! oasgate takes a dereferenced OpenAPI 3 contract and:
//!
//! - checks the contract itself against the OpenAPI 3.0 schema
//! - resolves each request to the contract operation it matches
//! - checks request parameters and bodies against their schemas
//! - dispatches it to a handler from an explicit controller registry
//! - checks the handler's response against the declared status codes,
//!   content types and schemas
//! - authenticates and authorizes requests from the contract's security
//!   schemes and a role/resource grant table
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use oasgate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pets = Controller::new().handler("showPetById", |req, res| async move {
//!         res.send(json!({ "id": req.param("petId") }))
//!             .map_err(|e| HandlerError::with_source("send failed", e))
//!     });
//!
//!     let gateway = Gateway::builder(contract)
//!         .config(ConfigLoader::new().with_development().with_env_prefix("OASGATE").load()?)
//!         .controllers(ControllerRegistry::new().register("PetsController", pets))
//!         .build()
//!         .await?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     oasgate::server::serve(listener, GatewayHandle::new(gateway), shutdown).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → RouteResolution → Authentication → Authorization → RequestValidation → Dispatch
//!                                                                                     ↓
//! Response ←───────────────────────── negotiate → resolve code → validate ← res.send(..)
//! ```

#![doc(html_root_url = "https://docs.rs/oasgate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod gateway;
mod handle;
pub mod server;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{Gateway, GatewayBuilder};
pub use handle::GatewayHandle;

// Re-export component crates
pub use oasgate_authz as authz;
pub use oasgate_config as config;
pub use oasgate_core as core;
pub use oasgate_middleware as middleware;
pub use oasgate_router as router;
pub use oasgate_sentinel as sentinel;
pub use oasgate_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use oasgate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Gateway, GatewayBuilder, GatewayError, GatewayHandle, GatewayResult};

    pub use oasgate_authz::{AuthzError, JwtVerifier, SourceLoader, SourceSpec, TokenVerifier};
    pub use oasgate_config::{ConfigLoader, GatewayConfig};
    pub use oasgate_core::{ContractDocument, GateError, Principal, RequestContext};
    pub use oasgate_middleware::{
        Controller, ControllerRegistry, HandlerError, OperationRequest, Responder, SendError,
    };
    pub use oasgate_sentinel::Payload;
    pub use oasgate_telemetry::{init_logging, LogConfig};

    pub use serde_json::json;
}
