//! Request checks.
//!
//! Path, query, header and cookie values arrive as strings. Each one is
//! coerced to the JSON type its schema declares before validation, so
//! `?limit=10` satisfies `{"type": "integer"}` and `?tags=a,b` satisfies an
//! array of strings. A value that does not coerce stays a string and fails
//! the schema's `type` check.
//!
//! Error paths are prefixed with where the value came from: `/path/petId`,
//! `/query/limit`, `/header/X-Trace`, `/cookie/session` or `/body`.

use std::collections::HashMap;

use http::header::COOKIE;
use http::{HeaderMap, Method};
use mime::Mime;
use oasgate_core::{ContractDocument, OperationEntry, ParameterLocation};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::debug;

use crate::error::{SentinelError, SentinelResult};
use crate::negotiation::{accepts, is_json};
use crate::schema::prepare_schema;
use crate::validation::{SchemaValidator, ValidationError, ValidationResult};

/// An incoming request, after route resolution.
#[derive(Debug)]
pub struct RequestCheck<'a> {
    /// The resolved operation.
    pub operation: &'a OperationEntry,
    /// Decoded path parameters.
    pub path_params: &'a [(&'a str, &'a str)],
    /// Raw query string, without `?`.
    pub query: Option<&'a str>,
    /// Request headers.
    pub headers: &'a HeaderMap,
    /// Request body.
    pub body: &'a [u8],
}

#[derive(Debug)]
struct CompiledParameter {
    name: String,
    location: ParameterLocation,
    required: bool,
    schema: Option<Value>,
    validator: Option<SchemaValidator>,
}

#[derive(Debug)]
struct CompiledMedia {
    media: Mime,
    validator: Option<SchemaValidator>,
}

#[derive(Debug)]
struct CompiledBody {
    required: bool,
    content: Vec<CompiledMedia>,
}

#[derive(Debug, Default)]
struct CompiledOperation {
    parameters: Vec<CompiledParameter>,
    body: Option<CompiledBody>,
}

/// Validates request parameters and JSON bodies against a contract.
///
/// Parameter and body schemas are prepared and compiled when the validator
/// is built.
#[derive(Debug)]
pub struct RequestValidator {
    operations: HashMap<(String, Method), CompiledOperation>,
}

impl RequestValidator {
    /// Compiles every parameter schema and JSON request body schema.
    pub fn from_contract(contract: &ContractDocument, ignore_unknown_formats: bool) -> SentinelResult<Self> {
        let mut operations = HashMap::new();
        let mut schema_count = 0usize;

        for operation in contract.operations() {
            let compile = |schema: &Value, target: String| {
                SchemaValidator::compile(&prepare_schema(schema), ignore_unknown_formats).map_err(|e| {
                    SentinelError::RequestSchema {
                        method: operation.method().to_string(),
                        path: operation.template().to_string(),
                        target,
                        reason: e.to_string(),
                    }
                })
            };

            let mut compiled = CompiledOperation::default();
            for param in operation.parameters() {
                let validator = match &param.schema {
                    Some(schema) => {
                        schema_count += 1;
                        Some(compile(schema, format!("parameter {} in {}", param.name, param.location))?)
                    }
                    None => None,
                };
                compiled.parameters.push(CompiledParameter {
                    name: param.name.clone(),
                    location: param.location,
                    required: param.required,
                    schema: param.schema.clone(),
                    validator,
                });
            }

            if let Some(body) = operation.request_body() {
                let mut content = Vec::new();
                for (media_type, schema) in body.content() {
                    let Ok(media) = media_type.parse::<Mime>() else { continue };
                    let validator = match schema {
                        Some(schema) if is_json(&media) => {
                            schema_count += 1;
                            Some(compile(schema, format!("request body ({media_type})"))?)
                        }
                        _ => None,
                    };
                    content.push(CompiledMedia { media, validator });
                }
                compiled.body = Some(CompiledBody {
                    required: body.required(),
                    content,
                });
            }

            operations.insert(
                (operation.template().to_string(), operation.method().clone()),
                compiled,
            );
        }

        debug!(schema_count, "request validator initialized");
        Ok(Self { operations })
    }

    /// Checks a request, collecting every violation.
    #[must_use]
    pub fn check(&self, check: RequestCheck<'_>) -> ValidationResult {
        let key = (check.operation.template().to_string(), check.operation.method().clone());
        let Some(compiled) = self.operations.get(&key) else {
            return ValidationResult::success();
        };

        let query = check.query.map(parse_query).unwrap_or_default();
        let cookies = parse_cookies(check.headers);
        let mut errors = Vec::new();

        for param in &compiled.parameters {
            let raw: Vec<String> = match param.location {
                ParameterLocation::Path => check
                    .path_params
                    .iter()
                    .filter(|(name, _)| *name == param.name)
                    .map(|(_, value)| (*value).to_string())
                    .collect(),
                ParameterLocation::Query => query.get(&param.name).cloned().unwrap_or_default(),
                ParameterLocation::Header => check
                    .headers
                    .get_all(param.name.as_str())
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .map(str::to_string)
                    .collect(),
                ParameterLocation::Cookie => cookies.get(&param.name).cloned().into_iter().collect(),
            };
            let path = format!("/{}/{}", param.location, param.name);

            if raw.is_empty() {
                if param.required {
                    errors.push(ValidationError {
                        instance_path: path,
                        schema_path: "/required".to_string(),
                        message: format!("Missing parameter {} in {}", param.name, param.location),
                    });
                }
                continue;
            }

            if let Some(validator) = &param.validator {
                let value = coerce(&raw, param.schema.as_ref());
                errors.extend(prefixed(&path, validator.validate(&value)));
            }
        }

        if let Some(body) = &compiled.body {
            check_body(body, check.headers, check.body, &mut errors);
        }

        if errors.is_empty() {
            ValidationResult::success()
        } else {
            ValidationResult::failure(errors)
        }
    }
}

fn check_body(body: &CompiledBody, headers: &HeaderMap, bytes: &[u8], errors: &mut Vec<ValidationError>) {
    let error = |schema_path: &str, message: String| ValidationError {
        instance_path: "/body".to_string(),
        schema_path: schema_path.to_string(),
        message,
    };

    if bytes.is_empty() {
        if body.required {
            errors.push(error("/requestBody/required", "Missing request body".to_string()));
        }
        return;
    }

    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let entry = match content_type {
        Some(raw) => {
            let matched = raw
                .parse::<Mime>()
                .ok()
                .and_then(|media| body.content.iter().find(|c| accepts(&c.media, None, &media)));
            match matched {
                Some(entry) => entry,
                None if body.content.is_empty() => return,
                None => {
                    errors.push(error("/requestBody/content", format!("Unsupported content type {raw}")));
                    return;
                }
            }
        }
        None => match body.content.iter().find(|c| is_json(&c.media)) {
            Some(entry) => entry,
            None => return,
        },
    };

    let Some(validator) = &entry.validator else { return };
    match serde_json::from_slice::<Value>(bytes) {
        Ok(instance) => errors.extend(prefixed("/body", validator.validate(&instance))),
        Err(e) => errors.push(error(
            "/requestBody/content",
            format!("Request body is not valid JSON: {e}"),
        )),
    }
}

fn prefixed(prefix: &str, result: ValidationResult) -> impl Iterator<Item = ValidationError> + '_ {
    result.errors.into_iter().map(move |mut e| {
        e.instance_path = format!("{prefix}{}", e.instance_path);
        e
    })
}

fn schema_type(schema: Option<&Value>) -> Option<&str> {
    schema?.get("type")?.as_str()
}

/// Turns the raw string values of one parameter into JSON.
fn coerce(raw: &[String], schema: Option<&Value>) -> Value {
    if schema_type(schema) == Some("array") {
        let items = schema.and_then(|s| s.get("items"));
        let values: Vec<&str> = match raw {
            [single] => single.split(',').collect(),
            many => many.iter().map(String::as_str).collect(),
        };
        return Value::Array(
            values
                .into_iter()
                .map(|v| coerce_scalar(v, schema_type(items)))
                .collect(),
        );
    }
    raw.first()
        .map_or(Value::Null, |first| coerce_scalar(first, schema_type(schema)))
}

fn coerce_scalar(raw: &str, kind: Option<&str>) -> Value {
    let parsed = match kind {
        Some("integer") => raw.parse::<i64>().ok().map(Value::from),
        Some("number") => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Some("boolean") => match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Some("object") => serde_json::from_str::<Value>(raw).ok().filter(Value::is_object),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::from(raw))
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Splits a query string into decoded values per key, in order.
fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut pairs: HashMap<String, Vec<String>> = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        pairs
            .entry(decode_component(key))
            .or_default()
            .push(decode_component(value));
    }
    pairs
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.to_string(), decode_component(value)))
        .collect()
}
