//! Pipeline stages.
//!
//! Stages run in a fixed order, then the [`Dispatch`] endpoint calls the
//! operation handler:
//!
//! 1. [`route_resolution`] - Match the request to a contract operation
//! 2. [`authentication`] - Verify credentials for secured operations
//! 3. [`authorization`] - Check the principal's grants
//! 4. [`request_validation`] - Check parameters and body against the contract
//! 5. [`dispatch`] - Run the handler and intercept its response

pub mod authentication;
pub mod authorization;
pub mod dispatch;
pub mod request_validation;
pub mod route_resolution;

pub use authentication::Authentication;
pub use authorization::Authorization;
pub use dispatch::Dispatch;
pub use request_validation::RequestValidation;
pub use route_resolution::RouteResolution;
