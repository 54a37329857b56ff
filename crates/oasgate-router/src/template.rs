//! Contract path templates.
//!
//! A [`PathTemplate`] is parsed once from a contract key such as
//! `/pets/{petId}/toys` and keeps both its segment list (for matching) and
//! its routing key (`/pets/:petId/toys`).

use percent_encoding::percent_decode_str;

use crate::params::Params;

/// One `/`-delimited piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly (case-sensitive).
    Literal(String),
    /// Accepts any request segment and binds it under this name.
    Param(String),
}

/// A parsed contract path template.
///
/// # Example
///
/// ```rust
/// use oasgate_router::PathTemplate;
///
/// let template = PathTemplate::parse("/pets/{petId}");
/// assert_eq!(template.routing_key(), "/pets/:petId");
/// assert_eq!(template.param_names().collect::<Vec<_>>(), vec!["petId"]);
///
/// let params = template.matches("/pets/42").unwrap();
/// assert_eq!(params.get("petId"), Some("42"));
/// assert!(template.matches("/pets/42/toys").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    routing_key: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a contract path template.
    #[must_use]
    pub fn parse(template: &str) -> Self {
        let segments = template.split('/').map(parse_segment).collect();
        Self {
            raw: template.to_string(),
            routing_key: to_routing_key(template),
            segments,
        }
    }

    /// The template exactly as written in the contract.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The framework-style key, with every `{name}` replaced by `:name`.
    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// The parsed segments, including the leading empty one for absolute paths.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the parameter slots, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches a concrete path against this template.
    ///
    /// Segment counts must be equal. Literals compare case-sensitively
    /// against the raw segment and parameter slots accept any value,
    /// including an empty one. Bound values are percent-decoded; invalid
    /// UTF-8 is replaced rather than rejected.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut params = Params::new();
        let mut parts = path.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.push(name.as_str(), percent_decode_str(part).decode_utf8_lossy());
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Converts a contract template into a routing key.
///
/// ```rust
/// assert_eq!(oasgate_router::to_routing_key("/a/{b}/c/{d}"), "/a/:b/c/:d");
/// ```
#[must_use]
pub fn to_routing_key(template: &str) -> String {
    template.replace('{', ":").replace('}', "")
}

fn parse_segment(part: &str) -> Segment {
    match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
            Segment::Param(name.to_string())
        }
        _ => Segment::Literal(part.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key_replaces_every_param() {
        let template = PathTemplate::parse("/orgs/{orgId}/users/{userId}");
        assert_eq!(template.routing_key(), "/orgs/:orgId/users/:userId");
        assert_eq!(template.as_str(), "/orgs/{orgId}/users/{userId}");
    }

    #[test]
    fn test_segments_are_parsed() {
        let template = PathTemplate::parse("/pets/{id}");
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal(String::new()),
                Segment::Literal("pets".to_string()),
                Segment::Param("id".to_string()),
            ]
        );
    }

    #[test]
    fn test_literal_match_is_case_sensitive() {
        let template = PathTemplate::parse("/Pets");
        assert!(template.matches("/Pets").is_some());
        assert!(template.matches("/pets").is_none());
    }

    #[test]
    fn test_segment_count_must_match() {
        let template = PathTemplate::parse("/pets/{id}");
        assert!(template.matches("/pets").is_none());
        assert!(template.matches("/pets/1/2").is_none());
        assert!(template.matches("/pets/1").is_some());
    }

    #[test]
    fn test_param_accepts_any_segment() {
        let template = PathTemplate::parse("/files/{name}");
        let params = template.matches("/files/report.final.pdf").unwrap();
        assert_eq!(params.get("name"), Some("report.final.pdf"));

        let params = template.matches("/files/").unwrap();
        assert_eq!(params.get("name"), Some(""));
    }

    #[test]
    fn test_partial_brace_segment_is_literal() {
        let template = PathTemplate::parse("/report.{format}x");
        assert_eq!(template.param_names().count(), 0);
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let template = PathTemplate::parse("/pets/{id}");
        assert_eq!(template.matches("/pets/a%20b").unwrap().get("id"), Some("a b"));
        assert_eq!(template.matches("/pets/caf%C3%A9").unwrap().get("id"), Some("café"));
        assert_eq!(template.matches("/pets/50%").unwrap().get("id"), Some("50%"));
    }

    #[test]
    fn test_literals_are_not_decoded() {
        let template = PathTemplate::parse("/my pets/{id}");
        assert!(template.matches("/my%20pets/1").is_none());
    }
}
