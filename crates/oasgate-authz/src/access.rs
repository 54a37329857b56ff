//! Access decisions against expanded grants.
//!
//! A descriptor grants an action with `<action>:any` or `<action>:own` keys:
//!
//! ```json
//! { "read:any": ["*"], "update:own": ["*"] }
//! ```
//!
//! `:own` grants only apply when every path parameter bound with
//! `x-acl-binding` equals the named claim of the principal.

use std::collections::HashSet;
use std::fmt;

use http::Method;
use oasgate_core::{OperationEntry, Principal};
use oasgate_router::Params;
use serde_json::Value;

use crate::grants::ExpandedGrants;

/// Grant action derived from the HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// POST
    Create,
    /// GET, HEAD, OPTIONS, TRACE
    Read,
    /// PUT, PATCH
    Update,
    /// DELETE
    Delete,
}

impl Action {
    /// Maps an HTTP method to its action.
    #[must_use]
    pub fn from_method(method: &Method) -> Self {
        match *method {
            Method::POST => Self::Create,
            Method::PUT | Method::PATCH => Self::Update,
            Method::DELETE => Self::Delete,
            _ => Self::Read,
        }
    }

    /// The action name used in descriptor keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`check_access`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// A grant allows the request.
    Allow {
        /// The role holding the grant.
        role: String,
    },
    /// Nothing allows the request.
    Deny {
        /// Why.
        reason: String,
    },
}

impl AccessDecision {
    /// Returns true if allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

/// Checks whether `principal` may perform `operation` with the given path parameters.
///
/// Roles come from the `role` claim and are widened through `$extend`.
#[must_use]
pub fn check_access(
    grants: &ExpandedGrants,
    principal: &Principal,
    operation: &OperationEntry,
    params: &Params,
) -> AccessDecision {
    let action = Action::from_method(operation.method());
    let template = operation.template();

    let roles = effective_roles(grants, principal.roles());
    if roles.is_empty() {
        return AccessDecision::Deny {
            reason: "No role in token".to_string(),
        };
    }

    let any = format!("{action}:any");
    let own = format!("{action}:own");

    for role in roles {
        let Some(descriptor) = grants.grant(role, template) else {
            continue;
        };

        if granted(descriptor, &any) {
            return AccessDecision::Allow { role: role.to_string() };
        }

        if granted(descriptor, &own) && owns(principal, operation, params) {
            return AccessDecision::Allow { role: role.to_string() };
        }
    }

    AccessDecision::Deny {
        reason: format!("Not allowed to {action} {template}"),
    }
}

/// Principal roles followed by inherited ones, without repeats.
fn effective_roles<'a>(grants: &'a ExpandedGrants, direct: Vec<&'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    let mut pending = direct;
    pending.reverse();

    while let Some(role) = pending.pop() {
        if !seen.insert(role) {
            continue;
        }
        ordered.push(role);
        if let Some(expanded) = grants.role(role) {
            pending.extend(expanded.parents().into_iter().rev());
        }
    }
    ordered
}

fn granted(descriptor: &Value, key: &str) -> bool {
    match descriptor.get(key) {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::Array(attributes)) => !attributes.is_empty(),
        Some(_) => true,
    }
}

fn owns(principal: &Principal, operation: &OperationEntry, params: &Params) -> bool {
    operation.acl_bindings().iter().all(|binding| {
        match (params.get(&binding.param), principal.claim_str(&binding.claim)) {
            (Some(value), Some(claim)) => value == claim,
            _ => false,
        }
    })
}
