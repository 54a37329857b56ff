//! Response content negotiation.
//!
//! Picks the media type a response is validated against and emitted as,
//! from the client's `Accept` header, the content type the handler set
//! explicitly (if any) and the media types the contract declares.
//!
//! Accept ranges are tried in header order and, within each range, declared
//! types in declaration order. The first pair that matches wins. Quality
//! weights do not influence the order.

use mime::Mime;

/// Outcome of [`negotiate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// A declared type matched.
    Matched(Mime),
    /// No usable `Accept` header; JSON is assumed.
    DefaultJson,
    /// `Accept` was given but nothing declared satisfies it.
    NoMatch,
}

/// Splits an `Accept` header into ranges, skipping ones that do not parse.
#[must_use]
pub fn parse_accept(header: &str) -> Vec<Mime> {
    header
        .split(',')
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .filter_map(|range| range.parse().ok())
        .collect()
}

/// Parses declared media types, skipping ones that do not parse.
pub fn parse_declared<'a>(declared: impl IntoIterator<Item = &'a str>) -> Vec<Mime> {
    declared.into_iter().filter_map(|d| d.parse().ok()).collect()
}

/// Negotiates the response media type.
///
/// ```
/// use oasgate_sentinel::{negotiate, parse_declared, Negotiation};
///
/// let declared = parse_declared(["application/json", "application/xml"]);
///
/// assert_eq!(
///     negotiate(Some("application/xml"), None, &declared),
///     Negotiation::Matched("application/xml".parse().unwrap()),
/// );
/// assert_eq!(negotiate(None, None, &declared), Negotiation::DefaultJson);
/// assert_eq!(negotiate(Some("text/plain"), None, &declared), Negotiation::NoMatch);
/// ```
#[must_use]
pub fn negotiate(accept: Option<&str>, explicit: Option<&Mime>, declared: &[Mime]) -> Negotiation {
    let ranges = accept.map(parse_accept).unwrap_or_default();
    if ranges.is_empty() {
        return Negotiation::DefaultJson;
    }

    ranges
        .iter()
        .find_map(|range| {
            declared
                .iter()
                .find(|candidate| accepts(range, explicit, candidate))
        })
        .map_or(Negotiation::NoMatch, |m| Negotiation::Matched(m.clone()))
}

pub(crate) fn accepts(range: &Mime, explicit: Option<&Mime>, candidate: &Mime) -> bool {
    let type_ok = range.type_() == mime::STAR || range.type_() == candidate.type_();
    let subtype_ok = range.subtype() == mime::STAR || range.subtype() == candidate.subtype();

    match explicit {
        Some(set) => {
            type_ok
                && subtype_ok
                && set.type_() == candidate.type_()
                && set.subtype() == candidate.subtype()
        }
        None => type_ok && subtype_ok,
    }
}

/// Returns true if the media type is `application/json` by essence.
#[must_use]
pub fn is_json(media: &Mime) -> bool {
    media.essence_str() == mime::APPLICATION_JSON.essence_str()
}

/// The header value emitted for a negotiated type: `<essence>;charset=utf-8`.
#[must_use]
pub fn content_type_header(media: &Mime) -> String {
    format!("{};charset=utf-8", media.essence_str())
}
