//! Handler output values.
//!
//! A [`Payload`] is what a handler hands to `send`. It is a JSON-like tree
//! with two extra variants: [`Payload::Absent`] for slots the handler left
//! unset, and [`Payload::Binary`] for raw bytes that must never be inspected.

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Default recursion limit for [`strip_undefined_slots`].
pub const DEFAULT_STRIP_DEPTH: usize = 1024;

/// A response value produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A slot that was never set. Dropped from objects, `null` inside arrays.
    Absent,
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered list.
    Array(Vec<Payload>),
    /// An object with keys in insertion order.
    Object(IndexMap<String, Payload>),
    /// Opaque bytes.
    Binary(Bytes),
}

impl Payload {
    /// Builds an object payload from `(key, value)` pairs.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Payload>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Converts to JSON.
    ///
    /// Absent object entries are omitted, absent array elements become
    /// `null`, and binary data becomes an array of byte values.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Absent | Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::String(s),
            Self::Array(items) => Value::Array(items.into_iter().map(Self::into_json).collect()),
            Self::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .filter(|(_, v)| !matches!(v, Self::Absent))
                    .map(|(k, v)| (k, v.into_json()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Binary(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
            }
        }
    }

    /// Returns true for [`Payload::Binary`].
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Returns true if an object slot holding this value would be dropped.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Binary(value)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Removes object entries bound to [`Payload::Absent`].
///
/// Array elements are never removed and binary data is not descended into.
/// Nesting deeper than `max_depth` is returned untouched.
///
/// ```
/// use oasgate_sentinel::{strip_undefined_slots, Payload};
///
/// let payload = Payload::object([("id", Payload::from(1)), ("tag", Payload::Absent)]);
/// let stripped = strip_undefined_slots(payload, 1024);
/// assert_eq!(stripped, Payload::object([("id", Payload::from(1))]));
/// ```
#[must_use]
pub fn strip_undefined_slots(payload: Payload, max_depth: usize) -> Payload {
    if max_depth == 0 {
        return payload;
    }
    match payload {
        Payload::Object(entries) => Payload::Object(
            entries
                .into_iter()
                .filter(|(_, v)| !v.is_absent())
                .map(|(k, v)| (k, strip_undefined_slots(v, max_depth - 1)))
                .collect(),
        ),
        Payload::Array(items) => Payload::Array(
            items
                .into_iter()
                .map(|v| strip_undefined_slots(v, max_depth - 1))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_json_omits_absent_object_slots() {
        let payload = Payload::object([
            ("id", Payload::from(1)),
            ("name", Payload::Absent),
            ("tags", Payload::Array(vec![Payload::from("a"), Payload::Absent])),
        ]);
        assert_eq!(payload.into_json(), json!({ "id": 1, "tags": ["a", null] }));
    }

    #[test]
    fn test_binary_renders_as_byte_array() {
        let payload = Payload::Binary(Bytes::from_static(&[1, 2, 255]));
        assert_eq!(payload.into_json(), json!([1, 2, 255]));
    }

    #[test]
    fn test_from_value_preserves_order() {
        let payload = Payload::from(json!({ "b": 1, "a": [true, null] }));
        let Payload::Object(entries) = &payload else {
            panic!("expected object");
        };
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(payload.into_json(), json!({ "b": 1, "a": [true, null] }));
    }

    #[test]
    fn test_option_maps_to_absent() {
        assert_eq!(Payload::from(None::<String>), Payload::Absent);
        assert_eq!(Payload::from(Some("x")), Payload::from("x"));
    }

    #[test]
    fn test_strip_removes_only_absent_object_slots() {
        let payload = Payload::object([
            ("keep", Payload::Null),
            ("drop", Payload::Absent),
            (
                "nested",
                Payload::object([("inner", Payload::Absent), ("flag", Payload::from(false))]),
            ),
        ]);
        let stripped = strip_undefined_slots(payload, DEFAULT_STRIP_DEPTH);
        assert_eq!(
            stripped,
            Payload::object([
                ("keep", Payload::Null),
                ("nested", Payload::object([("flag", Payload::from(false))])),
            ])
        );
    }

    #[test]
    fn test_strip_never_removes_array_elements() {
        let payload = Payload::Array(vec![Payload::Absent, Payload::from(2), Payload::Absent]);
        let stripped = strip_undefined_slots(payload.clone(), DEFAULT_STRIP_DEPTH);
        assert_eq!(stripped, payload);
    }

    #[test]
    fn test_strip_leaves_binary_untouched() {
        let payload = Payload::object([("file", Payload::Binary(Bytes::from_static(b"raw")))]);
        assert_eq!(strip_undefined_slots(payload.clone(), DEFAULT_STRIP_DEPTH), payload);
    }

    #[test]
    fn test_strip_stops_at_depth_limit() {
        let mut payload = Payload::object([("leaf", Payload::Absent)]);
        for _ in 0..2000 {
            payload = Payload::object([("next", payload)]);
        }
        let stripped = strip_undefined_slots(payload, DEFAULT_STRIP_DEPTH);

        let mut depth = 0;
        let mut cursor = &stripped;
        while let Payload::Object(entries) = cursor {
            if let Some(next) = entries.get("next") {
                cursor = next;
                depth += 1;
            } else {
                assert!(entries.contains_key("leaf"), "slot past the limit must survive");
                break;
            }
        }
        assert_eq!(depth, 2000);
    }

    #[test]
    fn test_strip_zero_depth_is_identity() {
        let payload = Payload::object([("gone", Payload::Absent)]);
        assert_eq!(strip_undefined_slots(payload.clone(), 0), payload);
    }
}
