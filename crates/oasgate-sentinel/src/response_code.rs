//! Status code to response object resolution.

use indexmap::IndexMap;
use oasgate_core::ResponseSpec;

/// Resolves the response object declared for `status`.
///
/// Checks the exact code, then its class (`2XX`), then `default`.
///
/// ```
/// use indexmap::IndexMap;
/// use oasgate_core::ResponseSpec;
/// use oasgate_sentinel::resolve_response;
///
/// let mut responses = IndexMap::new();
/// responses.insert("2XX".to_string(), ResponseSpec::new(Some("ok".into())));
/// responses.insert("default".to_string(), ResponseSpec::new(Some("error".into())));
///
/// assert_eq!(resolve_response(&responses, 204).unwrap().description(), Some("ok"));
/// assert_eq!(resolve_response(&responses, 500).unwrap().description(), Some("error"));
/// ```
#[must_use]
pub fn resolve_response(responses: &IndexMap<String, ResponseSpec>, status: u16) -> Option<&ResponseSpec> {
    resolve_response_key(responses, status).map(|(_, spec)| spec)
}

/// Like [`resolve_response`], also returning the key that matched.
#[must_use]
pub fn resolve_response_key(
    responses: &IndexMap<String, ResponseSpec>,
    status: u16,
) -> Option<(&str, &ResponseSpec)> {
    [status.to_string(), format!("{}XX", status / 100), "default".to_string()]
        .into_iter()
        .find_map(|key| responses.get_key_value(key.as_str()))
        .map(|(k, v)| (k.as_str(), v))
}
