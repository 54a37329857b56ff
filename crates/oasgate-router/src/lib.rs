//! Contract path-template router for oasgate.
//!
//! This crate maps concrete request paths back to the contract templates they
//! were declared under (`/pets/{petId}`), extracting path parameters on the
//! way. It is deliberately simple: templates are kept in registration order,
//! segments are compared one by one, and the first template that matches wins.
//!
//! # Features
//!
//! - **Exact-Segment Matching**: segment counts must agree, literals are case-sensitive
//! - **Path Parameters**: `{name}` slots accept any single segment
//! - **Routing Keys**: `/pets/{petId}` is also known as `/pets/:petId`
//! - **Base Path**: an optional prefix taken from the contract's first server
//!
//! # Example
//!
//! ```rust
//! use oasgate_router::{Router, MethodRouter};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(
//!     "/pets",
//!     MethodRouter::new()
//!         .method(&Method::GET, "listPets")
//!         .method(&Method::POST, "createPets"),
//! );
//! router.insert("/pets/{petId}", MethodRouter::new().method(&Method::GET, "showPetById"));
//!
//! let found = router.match_route(&Method::GET, "/pets/123").unwrap();
//! assert_eq!(found.operation_id, "showPetById");
//! assert_eq!(found.params.get("petId"), Some("123"));
//! ```
//!
//! # Matching
//!
//! ```text
//!   request  /pets/123          templates (in order)
//!              │                 ┌──────────────────┐
//!              ├── strip base ──►│ /pets            │ 2 segments ✗
//!              │                 │ /pets/{petId}    │ match, petId=123
//!              ▼                 │ /pets/{petId}/x  │ (not consulted)
//!          PathMatch             └──────────────────┘
//! ```

mod method_router;
mod params;
mod router;
mod template;

pub use method_router::{operation_method, MethodRouter, ALLOWED_METHODS};
pub use params::Params;
pub use router::Router;
pub use template::{to_routing_key, PathTemplate, Segment};

/// A request path matched to a template, before the method is considered.
#[derive(Debug, Clone)]
pub struct PathMatch<'a> {
    /// The template that matched
    pub template: &'a PathTemplate,
    /// Extracted path parameters
    pub params: Params,
    /// Methods declared on the template
    pub methods: &'a MethodRouter,
}

impl<'a> PathMatch<'a> {
    /// Creates a new path match.
    #[must_use]
    pub fn new(template: &'a PathTemplate, params: Params, methods: &'a MethodRouter) -> Self {
        Self {
            template,
            params,
            methods,
        }
    }
}

/// A matched route with its template, handler id and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The template that matched
    pub template: &'a PathTemplate,
    /// The handler id registered for the method
    pub operation_id: &'a str,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a> RouteMatch<'a> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(template: &'a PathTemplate, operation_id: &'a str, params: Params) -> Self {
        Self {
            template,
            operation_id,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use proptest::prelude::*;

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.route(&Method::GET, "/users", "listUsers");
        router.route(&Method::GET, "/users/{id}", "getUser");

        let m = router.match_route(&Method::GET, "/users").unwrap();
        assert_eq!(m.operation_id, "listUsers");
        assert!(m.params.is_empty());

        let m = router.match_route(&Method::GET, "/users/123").unwrap();
        assert_eq!(m.operation_id, "getUser");
        assert_eq!(m.params.get("id"), Some("123"));
    }

    #[test]
    fn test_multiple_params() {
        let mut router = Router::new();
        router.route(&Method::GET, "/orgs/{orgId}/users/{userId}", "getOrgUser");

        let m = router.match_route(&Method::GET, "/orgs/acme/users/123").unwrap();
        assert_eq!(m.params.get("orgId"), Some("acme"));
        assert_eq!(m.params.get("userId"), Some("123"));
        assert_eq!(m.template.routing_key(), "/orgs/:orgId/users/:userId");
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_.-]{1,8}"
    }

    proptest! {
        #[test]
        fn test_prop_param_template_binds_every_segment(values in prop::collection::vec(segment(), 1..6)) {
            let template: String = (0..values.len()).map(|i| format!("/{{p{i}}}")).collect();
            let path: String = values.iter().map(|v| format!("/{v}")).collect();

            let mut router = Router::new();
            router.route(&Method::GET, &template, "op");

            let found = router.match_route(&Method::GET, &path).unwrap();
            for (i, value) in values.iter().enumerate() {
                let name = format!("p{i}");
                prop_assert_eq!(found.params.get(&name), Some(value.as_str()));
            }
        }

        #[test]
        fn test_prop_segment_count_must_agree(values in prop::collection::vec(segment(), 1..6), extra in segment()) {
            let template: String = (0..values.len()).map(|i| format!("/{{p{i}}}")).collect();
            let longer: String = values.iter().chain(std::iter::once(&extra)).map(|v| format!("/{v}")).collect();

            let mut router = Router::new();
            router.route(&Method::GET, &template, "op");

            prop_assert!(router.match_path(&longer).is_none());
        }

        #[test]
        fn test_prop_routing_key_has_no_braces(names in prop::collection::vec("[a-zA-Z]{1,6}", 0..5)) {
            let template: String = names.iter().map(|n| format!("/items/{{{n}}}")).collect();
            let key = to_routing_key(&template);
            prop_assert!(!key.contains(['{', '}']), "braces left in routing key {}", key);
            prop_assert_eq!(key.matches(':').count(), names.len());
        }
    }
}
