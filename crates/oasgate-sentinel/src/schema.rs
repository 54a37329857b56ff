//! Schema preparation.
//!
//! Contract schemas use the OpenAPI `nullable` keyword, which plain JSON
//! Schema validators do not understand. [`prepare_schema`] rewrites it into
//! standard constraints before compilation.

use serde_json::Value;

/// Returns a copy of `schema` with every `nullable: true` rewritten.
///
/// On each such node `"null"` is added to `type` (a string type becomes a
/// two-element array) and `null` is added to `enum`, then `nullable` is
/// dropped. A node that constrains its value through `allOf`, `anyOf`,
/// `oneOf`, `not` or `$ref` would still reject `null` after widening, so it
/// becomes `{"anyOf": [<node>, {"type": "null"}]}` instead.
///
/// ```
/// use oasgate_sentinel::prepare_schema;
/// use serde_json::json;
///
/// let prepared = prepare_schema(&json!({ "type": "string", "nullable": true }));
/// assert_eq!(prepared, json!({ "type": ["string", "null"] }));
///
/// let prepared = prepare_schema(&json!({ "nullable": true, "allOf": [{ "type": "object" }] }));
/// assert_eq!(
///     prepared,
///     json!({ "anyOf": [{ "allOf": [{ "type": "object" }] }, { "type": "null" }] })
/// );
/// ```
#[must_use]
pub fn prepare_schema(schema: &Value) -> Value {
    let mut copy = schema.clone();
    fix_nullable(&mut copy);
    copy
}

const COMPOSITION_KEYWORDS: [&str; 5] = ["allOf", "anyOf", "oneOf", "not", "$ref"];

fn fix_nullable(node: &mut Value) {
    match node {
        Value::Object(map) => {
            map.values_mut().for_each(fix_nullable);
            if map.get("nullable") != Some(&Value::Bool(true)) {
                return;
            }
            map.remove("nullable");

            if COMPOSITION_KEYWORDS.iter().any(|k| map.contains_key(*k)) {
                let inner = Value::Object(std::mem::take(map));
                map.insert(
                    "anyOf".to_string(),
                    Value::Array(vec![inner, serde_json::json!({ "type": "null" })]),
                );
                return;
            }

            match map.get_mut("type") {
                Some(Value::String(kind)) => {
                    let kind = std::mem::take(kind);
                    map.insert(
                        "type".to_string(),
                        Value::Array(vec![Value::String(kind), Value::from("null")]),
                    );
                }
                Some(Value::Array(kinds)) => {
                    if !kinds.iter().any(|k| k == "null") {
                        kinds.push(Value::from("null"));
                    }
                }
                _ => {}
            }
            if let Some(Value::Array(values)) = map.get_mut("enum") {
                if !values.contains(&Value::Null) {
                    values.push(Value::Null);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(fix_nullable),
        _ => {}
    }
}
