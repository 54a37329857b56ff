//! Per-path method table.
//!
//! Contract path items may declare any of eight operations. [`MethodRouter`]
//! maps each declared method to the handler id of its operation.

use http::Method;

/// Methods a contract path item may declare, in registration order.
pub const ALLOWED_METHODS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Parses a lowercase path-item key (`"get"`, `"post"`, ...) into a method.
///
/// Any other key (`parameters`, `summary`, `x-*`) is not an operation.
///
/// ```rust
/// use oasgate_router::operation_method;
/// use http::Method;
///
/// assert_eq!(operation_method("patch"), Some(Method::PATCH));
/// assert_eq!(operation_method("parameters"), None);
/// assert_eq!(operation_method("GET"), None);
/// ```
#[must_use]
pub fn operation_method(key: &str) -> Option<Method> {
    ALLOWED_METHODS
        .iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(key) && key.bytes().all(|b| b.is_ascii_lowercase()))
        .cloned()
}

fn slot(method: &Method) -> Option<usize> {
    ALLOWED_METHODS.iter().position(|m| m == method)
}

/// Maps HTTP methods to handler ids for a single template.
///
/// # Example
///
/// ```rust
/// use oasgate_router::MethodRouter;
/// use http::Method;
///
/// let router = MethodRouter::new()
///     .method(&Method::GET, "listPets")
///     .method(&Method::POST, "createPet");
///
/// assert_eq!(router.get_operation(&Method::GET), Some("listPets"));
/// assert_eq!(router.get_operation(&Method::DELETE), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodRouter {
    slots: [Option<String>; 8],
}

impl MethodRouter {
    /// Creates an empty method table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler id for `method`.
    ///
    /// Methods outside [`ALLOWED_METHODS`] are ignored.
    #[must_use]
    pub fn method(mut self, method: &Method, operation_id: impl Into<String>) -> Self {
        if let Some(i) = slot(method) {
            self.slots[i] = Some(operation_id.into());
        }
        self
    }

    /// Returns the handler id registered for `method`.
    #[must_use]
    pub fn get_operation(&self, method: &Method) -> Option<&str> {
        slot(method).and_then(|i| self.slots[i].as_deref())
    }

    /// Copies in methods from `other` that are not yet registered here.
    pub fn merge(&mut self, other: MethodRouter) {
        for (mine, theirs) in self.slots.iter_mut().zip(other.slots) {
            if mine.is_none() {
                *mine = theirs;
            }
        }
    }

    /// Returns true if any method is registered.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Returns the registered methods in [`ALLOWED_METHODS`] order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        ALLOWED_METHODS
            .iter()
            .zip(&self.slots)
            .filter(|(_, s)| s.is_some())
            .map(|(m, _)| m.clone())
            .collect()
    }
}
