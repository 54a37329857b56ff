//! Path parameter storage.
//!
//! Parameters are kept in template order using a small vector, since
//! contract paths rarely carry more than a handful of `{name}` slots.

use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Number of parameters stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Path parameters extracted while matching a request path.
///
/// Values are the raw request segments; no decoding or coercion is applied.
///
/// # Example
///
/// ```rust
/// use oasgate_router::Params;
///
/// let mut params = Params::new();
/// params.push("petId", "42");
///
/// assert_eq!(params.get("petId"), Some("42"));
/// assert_eq!(params.get("ownerId"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no parameters were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Renders the parameters as a JSON object of strings.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .inner
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
