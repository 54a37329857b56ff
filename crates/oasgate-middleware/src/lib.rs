//! # oasgate Middleware
//!
//! The request pipeline: every request is matched to a contract operation,
//! optionally authenticated, authorized and checked, then dispatched to a registered
//! handler whose response is intercepted and checked against the contract.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → RouteResolution → Authentication → Authorization → RequestValidation → Dispatch
//!              │ 404              │ 401             │ 403             │ 400            │
//!              ▼                  ▼                 ▼                 ▼                ▼
//!           envelope          envelope          envelope          envelope    handler(req, res)
//!                                                                                    │ res.send(..)
//!                                                                                    ▼
//! Response ←──────────────────────────── SendInterceptor (negotiate, resolve, validate)
//! ```
//!
//! | Stage | Component           | Purpose                                 |
//! |-------|---------------------|-----------------------------------------|
//! | 1     | Route Resolution    | Match method and path to an operation   |
//! | 2     | Authentication      | Verify credentials (when enabled)       |
//! | 3     | Authorization       | Check grants (when enabled)             |
//! | 4     | Request Validation  | Check parameters and body (when enabled)|
//! | 5     | Dispatch            | Call the handler, intercept `send`      |
//!
//! ## Example
//!
//! ```
//! use oasgate_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 5);
//! assert_eq!(stages[0].name(), "route_resolution");
//! assert_eq!(stages[4].name(), "dispatch");
//! ```
//!
//! ## Handlers
//!
//! ```
//! use oasgate_middleware::{Controller, ControllerRegistry, HandlerError};
//! use serde_json::json;
//!
//! let pets = Controller::new().handler("getPet", |req, res| async move {
//!     let id = req.param("id").unwrap_or_default().to_string();
//!     res.send(json!({ "id": id }))
//!         .map_err(|e| HandlerError::with_source("send failed", e))
//! });
//! let registry = ControllerRegistry::new().register("PetsController", pets);
//! assert_eq!(registry.len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/oasgate-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod dispatcher;
pub mod interceptor;
pub mod middleware;
pub mod pipeline;
pub mod responder;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use context::{MiddlewareContext, PipelineState, StateError};
pub use dispatcher::{
    generate_name, Controller, ControllerRegistry, DispatchError, DispatchResult, HandlerError,
    HandlerFn, HandlerFuture, NameMode, OperationDispatcher, OperationRequest, ResolvedHandler,
    DEFAULT_CONTROLLER,
};
pub use interceptor::{PassThrough, ResponseValidationInterceptor};
pub use middleware::{BoxFuture, Endpoint, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use responder::{Outgoing, Responder, ResponseSlot, SendError, SendInterceptor, Transmission};
pub use stages::{Authentication, Authorization, Dispatch, RequestValidation, RouteResolution};
pub use types::{Request, Response, ResponseExt};
