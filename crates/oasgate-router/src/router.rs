//! Ordered template router.
//!
//! This module provides the [`Router`] that maps request paths back to the
//! contract template they were declared under.

use http::Method;
use indexmap::IndexMap;

use crate::method_router::MethodRouter;
use crate::template::PathTemplate;
use crate::{PathMatch, RouteMatch};

/// Router over contract path templates.
///
/// Templates are tried in registration order and the first one that matches
/// wins. A literal template registered after a parameterized one with the
/// same shape is therefore shadowed, mirroring how contract paths are mounted.
///
/// # Example
///
/// ```rust
/// use oasgate_router::{Router, MethodRouter};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert("/pets", MethodRouter::new().method(&Method::GET, "listPets"));
/// router.insert("/pets/{petId}", MethodRouter::new().method(&Method::GET, "showPetById"));
///
/// let found = router.match_route(&Method::GET, "/pets/7").unwrap();
/// assert_eq!(found.template.as_str(), "/pets/{petId}");
/// assert_eq!(found.operation_id, "showPetById");
/// assert_eq!(found.params.get("petId"), Some("7"));
/// ```
///
/// # Base Path
///
/// When a base path is set, it must prefix every request path and is removed
/// before templates are consulted:
///
/// ```rust
/// use oasgate_router::{Router, MethodRouter};
/// use http::Method;
///
/// let mut router = Router::new().with_base_path("/v1");
/// router.route(&Method::GET, "/pets", "listPets");
///
/// assert!(router.match_path("/v1/pets").is_some());
/// assert!(router.match_path("/pets").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<(PathTemplate, MethodRouter)>,
    dictionary: IndexMap<String, String>,
    base_path: String,
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mount prefix. A trailing `/` is dropped and `/` alone means none.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base = base_path.into();
        self.base_path = base.trim_end_matches('/').to_string();
        self
    }

    /// The mount prefix, empty when routes are served from the root.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Inserts a template with its methods.
    ///
    /// Inserting a template that is already registered merges the method
    /// tables; methods registered first are kept.
    pub fn insert(&mut self, template: &str, methods: MethodRouter) {
        if let Some((_, existing)) = self.routes.iter_mut().find(|(t, _)| t.as_str() == template) {
            existing.merge(methods);
            return;
        }

        let parsed = PathTemplate::parse(template);
        self.dictionary
            .entry(parsed.routing_key().to_string())
            .or_insert_with(|| template.to_string());
        self.routes.push((parsed, methods));
    }

    /// Convenience method to add a single-method route.
    pub fn route(&mut self, method: &Method, template: &str, operation_id: impl Into<String>) {
        self.insert(template, MethodRouter::new().method(method, operation_id));
    }

    /// Matches a request path to its template, ignoring the method.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathMatch<'_>> {
        let local = self.strip_base(path)?;
        self.routes.iter().find_map(|(template, methods)| {
            template
                .matches(local)
                .map(|params| PathMatch::new(template, params, methods))
        })
    }

    /// Matches a request path and method to a registered handler id.
    ///
    /// Templates are tried in registration order and the first one that
    /// both matches the path and declares `method` wins.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let local = self.strip_base(path)?;
        self.routes.iter().find_map(|(template, methods)| {
            let operation_id = methods.get_operation(method)?;
            let params = template.matches(local)?;
            Some(RouteMatch::new(template, operation_id, params))
        })
    }

    /// Routing key to contract template, in registration order.
    #[must_use]
    pub fn dictionary(&self) -> &IndexMap<String, String> {
        &self.dictionary
    }

    /// Iterates over registered templates and their method tables.
    pub fn routes(&self) -> impl Iterator<Item = (&PathTemplate, &MethodRouter)> {
        self.routes.iter().map(|(t, m)| (t, m))
    }

    /// Returns the number of templates registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn strip_base<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.base_path.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.base_path.as_str())? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}
