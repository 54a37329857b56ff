//! # oasgate Core
//!
//! Core types shared by every oasgate crate.
//!
//! - [`ContractDocument`] - The dereferenced API contract, loaded once
//! - [`OperationEntry`] - One operation with path- and method-level metadata merged
//! - [`RequestContext`] - Per-request state: resolved operation, params, principal
//! - [`GateError`] - Categorized request errors and their array envelope
//! - [`CoreError`] - Contract shape errors, fatal at initialization

#![doc(html_root_url = "https://docs.rs/oasgate-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contract;
mod context;
mod error;

pub use context::{Principal, RequestContext, RequestId};
pub use contract::{
    AclBinding, ContractDocument, OperationEntry, ParameterLocation, ParameterSpec,
    RequestBodySpec, ResponseSpec, SecurityRequirement, SecurityScheme, Server,
};
pub use error::{
    CoreError, CoreResult, ErrorCategory, ErrorEntry, ErrorEnvelope, GateError, GateResult,
};
