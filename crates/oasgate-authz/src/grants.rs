//! Grant tables and their expansion onto contract paths.
//!
//! A grant table maps roles to abstract resources, each carrying an opaque
//! permission descriptor:
//!
//! ```json
//! {
//!   "user":  { "users/{id}": { "read:own": ["*"] }, "$extend": ["guest"] },
//!   "guest": { "pets": { "read:any": ["*"] } }
//! }
//! ```
//!
//! Expansion rewrites every resource into the concrete contract paths it
//! covers. A resource covers a path when the resource's `/`-separated parts
//! appear, in order, among the path's parts. The first resource granting a
//! path wins and `$extend` is carried over verbatim.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AuthzError, AuthzResult};

/// Reserved key holding a role's inheritance list.
pub const EXTEND_KEY: &str = "$extend";

/// The resources granted to one role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleGrants {
    resources: IndexMap<String, Value>,
    extend: Option<Value>,
}

impl RoleGrants {
    /// Resource pattern to descriptor, in declaration order.
    #[must_use]
    pub fn resources(&self) -> &IndexMap<String, Value> {
        &self.resources
    }

    /// The verbatim `$extend` value.
    #[must_use]
    pub fn extend(&self) -> Option<&Value> {
        self.extend.as_ref()
    }
}

/// A parsed grant table: role to resource pattern to descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantTable {
    roles: IndexMap<String, RoleGrants>,
}

impl GrantTable {
    /// Parses a grant table.
    ///
    /// `scheme` only labels the error for a non-object table.
    pub fn from_value(scheme: &str, value: &Value) -> AuthzResult<Self> {
        let obj = value.as_object().ok_or_else(|| AuthzError::InvalidGrantTable {
            scheme: scheme.to_string(),
        })?;

        let mut roles = IndexMap::with_capacity(obj.len());
        for (role, entry) in obj {
            let entry = entry
                .as_object()
                .ok_or_else(|| AuthzError::InvalidRole { role: role.clone() })?;

            let mut grants = RoleGrants::default();
            for (resource, descriptor) in entry {
                if resource == EXTEND_KEY {
                    grants.extend = Some(descriptor.clone());
                } else {
                    grants.resources.insert(resource.clone(), descriptor.clone());
                }
            }
            roles.insert(role.clone(), grants);
        }

        Ok(Self { roles })
    }

    /// Roles in declaration order.
    #[must_use]
    pub fn roles(&self) -> &IndexMap<String, RoleGrants> {
        &self.roles
    }
}

/// One role's grants after expansion: contract path to descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedRole {
    paths: IndexMap<String, Value>,
    extend: Option<Value>,
}

impl ExpandedRole {
    /// Contract path to descriptor.
    #[must_use]
    pub fn paths(&self) -> &IndexMap<String, Value> {
        &self.paths
    }

    /// The verbatim `$extend` value.
    #[must_use]
    pub fn extend(&self) -> Option<&Value> {
        self.extend.as_ref()
    }

    /// Names of the roles this role inherits from.
    ///
    /// `$extend` may be a single role name or an array of names.
    #[must_use]
    pub fn parents(&self) -> Vec<&str> {
        match &self.extend {
            Some(Value::String(role)) => vec![role.as_str()],
            Some(Value::Array(roles)) => roles.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Grants keyed by concrete contract path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedGrants {
    roles: IndexMap<String, ExpandedRole>,
}

impl ExpandedGrants {
    /// Looks up a role.
    #[must_use]
    pub fn role(&self, role: &str) -> Option<&ExpandedRole> {
        self.roles.get(role)
    }

    /// The descriptor granted to `role` on contract path `template`.
    #[must_use]
    pub fn grant(&self, role: &str, template: &str) -> Option<&Value> {
        self.roles.get(role)?.paths.get(template)
    }

    /// Roles in declaration order.
    pub fn roles(&self) -> impl Iterator<Item = (&str, &ExpandedRole)> {
        self.roles.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renders the expanded table in the grant table shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let roles = self
            .roles
            .iter()
            .map(|(role, expanded)| {
                let mut entry: Map<String, Value> = expanded
                    .paths
                    .iter()
                    .map(|(path, descriptor)| (path.clone(), descriptor.clone()))
                    .collect();
                if let Some(extend) = &expanded.extend {
                    entry.insert(EXTEND_KEY.to_string(), extend.clone());
                }
                (role.clone(), Value::Object(entry))
            })
            .collect();
        Value::Object(roles)
    }
}

/// Expands a grant table onto the given contract paths.
///
/// ```
/// use oasgate_authz::{expand_grants, GrantTable};
/// use serde_json::json;
///
/// let table = GrantTable::from_value("bearer", &json!({
///     "user": { "users/{id}": { "read:own": ["*"] } }
/// }))
/// .unwrap();
/// let expanded = expand_grants(["/users/{id}", "/users/{id}/orders", "/admin"], &table);
///
/// assert!(expanded.grant("user", "/users/{id}").is_some());
/// assert!(expanded.grant("user", "/users/{id}/orders").is_some());
/// assert!(expanded.grant("user", "/admin").is_none());
/// ```
pub fn expand_grants<'a>(contract_paths: impl IntoIterator<Item = &'a str>, table: &GrantTable) -> ExpandedGrants {
    let paths: Vec<(&str, Vec<&str>)> = contract_paths
        .into_iter()
        .map(|path| (path, path.split('/').collect()))
        .collect();

    let mut roles = IndexMap::with_capacity(table.roles.len());
    for (role, grants) in &table.roles {
        let mut expanded = ExpandedRole {
            paths: IndexMap::new(),
            extend: grants.extend.clone(),
        };

        for (resource, descriptor) in &grants.resources {
            let resource_parts: Vec<&str> = resource.split('/').collect();
            for (path, path_parts) in &paths {
                if !expanded.paths.contains_key(*path) && covers(&resource_parts, path_parts) {
                    expanded.paths.insert((*path).to_string(), descriptor.clone());
                }
            }
        }

        debug!(role = %role, paths = expanded.paths.len(), "expanded grants");
        roles.insert(role.clone(), expanded);
    }

    ExpandedGrants { roles }
}

/// Ordered subsequence match: each resource part must appear after the
/// position where the previous one was found.
fn covers(resource_parts: &[&str], path_parts: &[&str]) -> bool {
    let mut start = 0;
    for part in resource_parts {
        match path_parts[start..].iter().position(|p| p == part) {
            Some(offset) => start += offset + 1,
            None => return false,
        }
    }
    true
}
