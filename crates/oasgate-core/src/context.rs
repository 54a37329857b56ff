//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state through the pipeline
//! and into handlers: the resolved operation, its path parameters and the
//! authenticated principal.

use std::sync::Arc;
use std::time::Instant;

use http::Method;
use oasgate_router::Params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::contract::OperationEntry;

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use oasgate_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated caller: the verified token claims and the scheme that
/// accepted them.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    scheme: String,
    claims: Value,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(scheme: impl Into<String>, claims: Value) -> Self {
        Self {
            scheme: scheme.into(),
            claims,
        }
    }

    /// The security scheme that authenticated the caller.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// All claims.
    #[must_use]
    pub fn claims(&self) -> &Value {
        &self.claims
    }

    /// A claim rendered as a string, for comparison with path parameters.
    #[must_use]
    pub fn claim_str(&self, name: &str) -> Option<String> {
        match self.claims.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Roles from the `role` claim, which may be a string or an array.
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        match self.claims.get("role") {
            Some(Value::String(role)) => vec![role.as_str()],
            Some(Value::Array(roles)) => roles.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Per-request context owned by one pipeline invocation.
///
/// # Example
///
/// ```
/// use oasgate_core::RequestContext;
/// use http::Method;
///
/// let ctx = RequestContext::new(Method::GET, "/pets/1");
/// assert!(ctx.operation().is_none());
/// assert!(ctx.principal().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    operation: Option<Arc<OperationEntry>>,
    params: Params,
    principal: Option<Principal>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context for a request with a fresh request ID.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            operation: None,
            params: Params::new(),
            principal: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path, without query.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Binds the resolved operation and its path parameters.
    pub fn bind_operation(&mut self, operation: Arc<OperationEntry>, params: Params) {
        self.operation = Some(operation);
        self.params = params;
    }

    /// The resolved operation.
    #[must_use]
    pub fn operation(&self) -> Option<&Arc<OperationEntry>> {
        self.operation.as_ref()
    }

    /// The resolved template, if any.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.operation.as_deref().map(OperationEntry::template)
    }

    /// Path parameters extracted for the resolved template.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the authenticated principal.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Sets the authenticated principal.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractDocument;
    use serde_json::json;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
        assert_eq!(id1.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36, "UUID string should be 36 characters");
    }

    #[test]
    fn test_request_context_bind_operation() {
        let contract = ContractDocument::from_value(json!({
            "paths": { "/pets/{id}": { "get": { "operationId": "getPet" } } }
        }))
        .unwrap();
        let entry = Arc::clone(&contract.operations()[0]);

        let mut params = Params::new();
        params.push("id", "9");

        let mut ctx = RequestContext::new(Method::GET, "/pets/9");
        ctx.bind_operation(entry, params);

        assert_eq!(ctx.template(), Some("/pets/{id}"));
        assert_eq!(ctx.params().get("id"), Some("9"));
        assert_eq!(ctx.operation().and_then(|o| o.operation_id()), Some("getPet"));
    }

    #[test]
    fn test_principal_roles() {
        let single = Principal::new("bearerAuth", json!({ "role": "admin" }));
        assert_eq!(single.roles(), vec!["admin"]);

        let many = Principal::new("bearerAuth", json!({ "role": ["user", 3, "auditor"] }));
        assert_eq!(many.roles(), vec!["user", "auditor"]);

        let none = Principal::new("bearerAuth", json!({}));
        assert!(none.roles().is_empty());
    }

    #[test]
    fn test_principal_claim_str() {
        let principal = Principal::new("bearerAuth", json!({ "sub": "alice", "uid": 42, "obj": {} }));
        assert_eq!(principal.claim_str("sub").as_deref(), Some("alice"));
        assert_eq!(principal.claim_str("uid").as_deref(), Some("42"));
        assert_eq!(principal.claim_str("obj"), None);
        assert_eq!(principal.claim_str("missing"), None);
    }
}
