//! oasgate Authz - contract-driven authentication and grant checks
//!
//! This crate turns the security declarations of a contract, plus externally
//! supplied claims and grants sources, into request-time decisions.
//!
//! # Overview
//!
//! - Load bearer configurations and grant tables from inline JSON, files or URLs
//! - Expand abstract role/resource grants onto concrete contract paths
//! - Verify bearer tokens (JWT by default, pluggable per scheme)
//! - Decide access from the HTTP method, the expanded grants and ACL bindings
//!
//! # Architecture
//!
//! ```text
//!   x-bearer-config / security_files      x-acl-config / grants_files
//!                 │                                   │
//!        ┌────────▼────────┐                 ┌────────▼────────┐
//!        │  SourceLoader   │                 │  SourceLoader   │
//!        └────────┬────────┘                 └────────┬────────┘
//!                 │ bearer config                     │ GrantTable
//!        ┌────────▼────────┐                 ┌────────▼────────┐
//!        │  JwtVerifier    │                 │  expand_grants  │
//!        └────────┬────────┘                 └────────┬────────┘
//!                 └───────────────┬───────────────────┘
//!                        ┌────────▼─────────┐
//!      request headers ─►│ SecurityRegistry │─► Principal / AccessDecision
//!                        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use oasgate_authz::{expand_grants, GrantTable};
//! use serde_json::json;
//!
//! let table = GrantTable::from_value("bearerAuth", &json!({
//!     "user": { "pets": { "read:any": ["*"] }, "$extend": ["guest"] }
//! }))
//! .unwrap();
//!
//! let expanded = expand_grants(["/pets", "/pets/{id}", "/owners"], &table);
//! let user = expanded.role("user").unwrap();
//! assert_eq!(user.paths().len(), 2);
//! assert_eq!(user.extend(), Some(&json!(["guest"])));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod error;
pub mod grants;
pub mod jwt;
pub mod security;
pub mod source;

// Re-exports for convenience
pub use access::{check_access, AccessDecision, Action};
pub use error::{AuthzError, AuthzResult};
pub use grants::{expand_grants, ExpandedGrants, ExpandedRole, GrantTable, RoleGrants, EXTEND_KEY};
pub use jwt::JwtVerifier;
pub use security::{SecurityRegistry, SecuritySources, TokenVerifier};
pub use source::{SourceLoader, SourceSpec};
