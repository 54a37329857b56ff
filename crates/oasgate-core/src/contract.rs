//! Contract document model.
//!
//! A [`ContractDocument`] is built once from an already dereferenced OpenAPI 3
//! document. Loading walks `paths` in declaration order and merges path-level
//! and operation-level declarations into read-only [`OperationEntry`] values,
//! so nothing downstream needs to consult the raw JSON again.
//!
//! # Example
//!
//! ```
//! use oasgate_core::contract::ContractDocument;
//! use http::Method;
//! use serde_json::json;
//!
//! let contract = ContractDocument::from_value(json!({
//!     "openapi": "3.0.0",
//!     "servers": [{ "url": "http://api.example.com/v1" }],
//!     "paths": {
//!         "/pets/{petId}": {
//!             "get": {
//!                 "operationId": "showPetById",
//!                 "responses": { "200": { "description": "A pet" } }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let entry = contract.operation("/pets/{petId}", &Method::GET).unwrap();
//! assert_eq!(entry.operation_id(), Some("showPetById"));
//! assert_eq!(contract.base_path(), "/v1");
//! ```

use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use oasgate_router::operation_method;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{CoreError, CoreResult};

/// Operation-level and path-level router hint extensions, in precedence order.
const HINT_KEYS: [&str; 2] = ["x-router-controller", "x-swagger-router-controller"];

/// Parameter extension binding a path parameter to a claim.
const ACL_BINDING_KEY: &str = "x-acl-binding";

/// The full, dereferenced API contract.
#[derive(Debug, Clone)]
pub struct ContractDocument {
    raw: Arc<Value>,
    frozen: Arc<Value>,
    paths: Vec<String>,
    operations: Vec<Arc<OperationEntry>>,
    security_schemes: IndexMap<String, SecurityScheme>,
    servers: Vec<Server>,
}

impl ContractDocument {
    /// Builds a contract from a dereferenced document.
    ///
    /// Fails when the document, a path item, an operation or a security
    /// scheme has the wrong shape. Keys of a path item other than the eight
    /// operation methods are not treated as operations.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let root = value.as_object().ok_or(CoreError::NotAnObject)?;
        let paths_obj = root
            .get("paths")
            .and_then(Value::as_object)
            .ok_or(CoreError::MissingPaths)?;

        let top_security = match root.get("security") {
            Some(v) => Some(parse_security(v).ok_or_else(|| CoreError::InvalidField {
                path: String::new(),
                method: String::new(),
                field: "security".to_string(),
            })?),
            None => None,
        };

        let mut paths = Vec::with_capacity(paths_obj.len());
        let mut operations = Vec::new();
        for (path, item) in paths_obj {
            let item = item
                .as_object()
                .ok_or_else(|| CoreError::InvalidPathItem { path: path.clone() })?;
            paths.push(path.clone());

            for (key, op) in item {
                let Some(method) = operation_method(key) else {
                    continue;
                };
                let entry = OperationEntry::merge(path, method, item, op, top_security.as_deref())?;
                operations.push(Arc::new(entry));
            }
        }

        let security_schemes = parse_security_schemes(root)?;
        let servers = parse_servers(root)?;
        let frozen = Arc::new(with_relative_server(&value, &servers));

        Ok(Self {
            raw: Arc::new(value),
            frozen,
            paths,
            operations,
            security_schemes,
            servers,
        })
    }

    /// The document exactly as loaded.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.raw
    }

    /// Read-only snapshot for documentation, with a relative server ensured.
    #[must_use]
    pub fn frozen_document(&self) -> Arc<Value> {
        Arc::clone(&self.frozen)
    }

    /// Path templates in declaration order, including those without operations.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// All operations, in path then method declaration order.
    #[must_use]
    pub fn operations(&self) -> &[Arc<OperationEntry>] {
        &self.operations
    }

    /// Looks up the operation for a template and method.
    #[must_use]
    pub fn operation(&self, template: &str, method: &Method) -> Option<&Arc<OperationEntry>> {
        self.operations
            .iter()
            .find(|op| op.template() == template && op.method() == method)
    }

    /// Security schemes under `components.securitySchemes`.
    #[must_use]
    pub fn security_schemes(&self) -> &IndexMap<String, SecurityScheme> {
        &self.security_schemes
    }

    /// Looks up a security scheme by name.
    #[must_use]
    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.security_schemes.get(name)
    }

    /// Servers as declared.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Mount prefix derived from the first server.
    ///
    /// A relative url is used with its trailing `/` removed. For an absolute
    /// url the path after the host is used, and a bare `/` yields `""`.
    #[must_use]
    pub fn base_path(&self) -> String {
        let Some(first) = self.servers.first() else {
            return String::new();
        };
        let url = first.url.as_str();
        if url.starts_with('/') {
            return url.strip_suffix('/').unwrap_or(url).to_string();
        }
        let tail: Vec<&str> = url.split('/').skip(3).collect();
        let base = format!("/{}", tail.join("/"));
        let base = base.strip_suffix('/').unwrap_or(&base);
        base.to_string()
    }
}

/// One contract operation with its merged metadata.
#[derive(Debug, Clone)]
pub struct OperationEntry {
    template: String,
    method: Method,
    operation_id: Option<String>,
    responses: IndexMap<String, ResponseSpec>,
    security: Vec<SecurityRequirement>,
    router_hint: Option<String>,
    parameters: Vec<ParameterSpec>,
    request_body: Option<RequestBodySpec>,
    acl_bindings: Vec<AclBinding>,
    raw: Value,
}

impl OperationEntry {
    fn merge(
        template: &str,
        method: Method,
        item: &Map<String, Value>,
        op: &Value,
        top_security: Option<&[SecurityRequirement]>,
    ) -> CoreResult<Self> {
        let invalid = |field: &str| CoreError::InvalidField {
            path: template.to_string(),
            method: method.as_str().to_string(),
            field: field.to_string(),
        };
        let op_obj = op.as_object().ok_or_else(|| CoreError::InvalidOperation {
            path: template.to_string(),
            method: method.as_str().to_string(),
        })?;

        let operation_id = match op_obj.get("operationId") {
            None => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(invalid("operationId")),
        };

        let responses = match op_obj.get("responses") {
            None => IndexMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(code, spec)| {
                    ResponseSpec::from_value(spec)
                        .map(|spec| (code.clone(), spec))
                        .ok_or_else(|| invalid("responses"))
                })
                .collect::<CoreResult<_>>()?,
            Some(_) => return Err(invalid("responses")),
        };

        let security = match op_obj.get("security") {
            Some(v) => parse_security(v).ok_or_else(|| invalid("security"))?,
            None => top_security.map(<[_]>::to_vec).unwrap_or_default(),
        };

        let router_hint = HINT_KEYS
            .iter()
            .find_map(|k| op_obj.get(*k).and_then(Value::as_str))
            .or_else(|| HINT_KEYS.iter().find_map(|k| item.get(*k).and_then(Value::as_str)))
            .map(str::to_string);

        let parameters = merge_parameters(item.get("parameters"), op_obj.get("parameters"));
        let acl_bindings = parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
            .filter_map(|p| {
                Some(AclBinding {
                    param: p.name.clone(),
                    claim: p.acl_binding.clone()?,
                })
            })
            .collect();

        let request_body = match op_obj.get("requestBody") {
            None => None,
            Some(body) => Some(RequestBodySpec::from_value(body).ok_or_else(|| invalid("requestBody"))?),
        };

        Ok(Self {
            template: template.to_string(),
            method,
            operation_id,
            responses,
            security,
            router_hint,
            parameters,
            request_body,
            acl_bindings,
            raw: op.clone(),
        })
    }

    /// The contract path template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The declared `operationId`.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Responses keyed by status code, code class or `default`, in declaration order.
    #[must_use]
    pub fn responses(&self) -> &IndexMap<String, ResponseSpec> {
        &self.responses
    }

    /// Effective security requirements (operation-level over top-level).
    ///
    /// Alternatives are OR-ed; the schemes within one requirement are AND-ed.
    #[must_use]
    pub fn security(&self) -> &[SecurityRequirement] {
        &self.security
    }

    /// Returns true if the operation declares any non-empty requirement.
    #[must_use]
    pub fn has_security(&self) -> bool {
        self.security.iter().any(|r| !r.is_empty())
    }

    /// Effective router controller hint.
    #[must_use]
    pub fn router_hint(&self) -> Option<&str> {
        self.router_hint.as_deref()
    }

    /// Parameters declared on the path item and the operation, the
    /// operation's winning on a shared `(name, in)`.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// The declared request body.
    #[must_use]
    pub fn request_body(&self) -> Option<&RequestBodySpec> {
        self.request_body.as_ref()
    }

    /// Path parameters bound to principal claims.
    #[must_use]
    pub fn acl_bindings(&self) -> &[AclBinding] {
        &self.acl_bindings
    }

    /// The raw operation object.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// A response object: description plus media type to optional schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSpec {
    description: Option<String>,
    content: IndexMap<String, Option<Value>>,
}

impl ResponseSpec {
    /// Creates a response spec.
    #[must_use]
    pub fn new(description: Option<String>) -> Self {
        Self {
            description,
            content: IndexMap::new(),
        }
    }

    /// Adds a media type with an optional schema.
    #[must_use]
    pub fn with_content(mut self, media_type: impl Into<String>, schema: Option<Value>) -> Self {
        self.content.insert(media_type.into(), schema);
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let content = match obj.get("content") {
            None => IndexMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(media, spec)| (media.clone(), spec.get("schema").cloned()))
                .collect(),
            Some(_) => return None,
        };
        Some(Self {
            description,
            content,
        })
    }

    /// The response description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared media types and their schemas, in declaration order.
    #[must_use]
    pub fn content(&self) -> &IndexMap<String, Option<Value>> {
        &self.content
    }

    /// The schema declared for a media type.
    #[must_use]
    pub fn schema_for(&self, media_type: &str) -> Option<&Value> {
        self.content.get(media_type).and_then(Option::as_ref)
    }
}

/// One security requirement object: scheme name to scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRequirement {
    schemes: IndexMap<String, Vec<String>>,
}

impl SecurityRequirement {
    /// Creates a requirement from `(scheme, scopes)` pairs.
    #[must_use]
    pub fn new(schemes: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        Self {
            schemes: schemes.into_iter().collect(),
        }
    }

    /// Scheme names in declaration order.
    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    /// Scopes required for a scheme.
    #[must_use]
    pub fn scopes(&self, scheme: &str) -> Option<&[String]> {
        self.schemes.get(scheme).map(Vec::as_slice)
    }

    /// Returns true for `{}` (anonymous access allowed).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

/// A security scheme under `components.securitySchemes`.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityScheme {
    name: String,
    kind: String,
    scheme: Option<String>,
    bearer_format: Option<String>,
    location: Option<String>,
    param_name: Option<String>,
    bearer_config: Option<Value>,
    acl_config: Option<Value>,
}

impl SecurityScheme {
    fn from_value(name: &str, value: &Value) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidSecurityScheme {
            name: name.to_string(),
        };
        let obj = value.as_object().ok_or_else(invalid)?;
        let kind = obj.get("type").and_then(Value::as_str).ok_or_else(invalid)?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            name: name.to_string(),
            kind: kind.to_string(),
            scheme: text("scheme"),
            bearer_format: text("bearerFormat"),
            location: text("in"),
            param_name: text("name"),
            bearer_config: obj.get("x-bearer-config").cloned(),
            acl_config: obj.get("x-acl-config").cloned(),
        })
    }

    /// The scheme name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scheme `type` (`http`, `apiKey`, ...).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The HTTP auth scheme, for `type: http`.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// The bearer format hint.
    #[must_use]
    pub fn bearer_format(&self) -> Option<&str> {
        self.bearer_format.as_deref()
    }

    /// Where an `apiKey` credential is carried (`header`, `query`, `cookie`).
    #[must_use]
    pub fn api_key_location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// The header, query or cookie name of an `apiKey` credential.
    #[must_use]
    pub fn api_key_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    /// Returns true for `type: http`, `scheme: bearer`, `bearerFormat: JWT`.
    #[must_use]
    pub fn is_bearer_jwt(&self) -> bool {
        self.kind == "http"
            && self.scheme.as_deref() == Some("bearer")
            && self.bearer_format.as_deref() == Some("JWT")
    }

    /// The `x-bearer-config` extension (claims verification source).
    #[must_use]
    pub fn bearer_config(&self) -> Option<&Value> {
        self.bearer_config.as_ref()
    }

    /// The `x-acl-config` extension (grants source).
    #[must_use]
    pub fn acl_config(&self) -> Option<&Value> {
        self.acl_config.as_ref()
    }
}

/// A contract server entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    /// The server url, absolute or relative.
    pub url: String,
    /// Optional description.
    pub description: Option<String>,
}

impl Server {
    /// Returns true for `http://localhost...` or a relative url.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.url.starts_with("http://localhost") || self.url.starts_with('/')
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    /// A templated path segment.
    Path,
    /// A query string pair.
    Query,
    /// A request header.
    Header,
    /// A cookie.
    Cookie,
}

impl ParameterLocation {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    /// The contract spelling (`path`, `query`, `header`, `cookie`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Where it is carried.
    pub location: ParameterLocation,
    /// Path parameters are always required.
    pub required: bool,
    /// The value schema, if declared.
    pub schema: Option<Value>,
    /// Claim named by `x-acl-binding`.
    pub acl_binding: Option<String>,
}

/// A declared request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBodySpec {
    required: bool,
    content: IndexMap<String, Option<Value>>,
}

impl RequestBodySpec {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let content = match obj.get("content") {
            None => IndexMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(media, spec)| (media.clone(), spec.get("schema").cloned()))
                .collect(),
            Some(_) => return None,
        };
        Some(Self {
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
            content,
        })
    }

    /// Whether a body must be sent.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Accepted media types and their schemas, in declaration order.
    #[must_use]
    pub fn content(&self) -> &IndexMap<String, Option<Value>> {
        &self.content
    }
}

/// A path parameter whose value must equal a principal claim for `:own` grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclBinding {
    /// The path parameter name.
    pub param: String,
    /// The claim the parameter must equal.
    pub claim: String,
}

fn parse_security(value: &Value) -> Option<Vec<SecurityRequirement>> {
    value
        .as_array()?
        .iter()
        .map(|req| {
            let obj = req.as_object()?;
            let schemes = obj
                .iter()
                .map(|(name, scopes)| {
                    let scopes = scopes
                        .as_array()?
                        .iter()
                        .map(|s| s.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()?;
                    Some((name.clone(), scopes))
                })
                .collect::<Option<Vec<_>>>()?;
            Some(SecurityRequirement::new(schemes))
        })
        .collect()
}

fn parse_security_schemes(root: &Map<String, Value>) -> CoreResult<IndexMap<String, SecurityScheme>> {
    let Some(schemes) = root
        .get("components")
        .and_then(|c| c.get("securitySchemes"))
        .and_then(Value::as_object)
    else {
        return Ok(IndexMap::new());
    };

    schemes
        .iter()
        .map(|(name, value)| SecurityScheme::from_value(name, value).map(|s| (name.clone(), s)))
        .collect()
}

fn parse_servers(root: &Map<String, Value>) -> CoreResult<Vec<Server>> {
    let Some(servers) = root.get("servers") else {
        return Ok(Vec::new());
    };
    servers
        .as_array()
        .ok_or(CoreError::InvalidServers)?
        .iter()
        .map(|s| {
            let url = s
                .get("url")
                .and_then(Value::as_str)
                .ok_or(CoreError::InvalidServers)?;
            Ok(Server {
                url: url.to_string(),
                description: s.get("description").and_then(Value::as_str).map(str::to_string),
            })
        })
        .collect()
}

/// Operation parameters override path parameters with the same `(name, in)`.
/// Entries without a name or a known location are skipped.
fn merge_parameters(path_params: Option<&Value>, op_params: Option<&Value>) -> Vec<ParameterSpec> {
    let mut merged: IndexMap<(String, ParameterLocation), ParameterSpec> = IndexMap::new();
    for list in [path_params, op_params].into_iter().flatten().filter_map(Value::as_array) {
        for param in list {
            let name = param.get("name").and_then(Value::as_str);
            let location = param
                .get("in")
                .and_then(Value::as_str)
                .and_then(ParameterLocation::parse);
            let (Some(name), Some(location)) = (name, location) else {
                continue;
            };
            let spec = ParameterSpec {
                name: name.to_string(),
                location,
                required: location == ParameterLocation::Path
                    || param.get("required").and_then(Value::as_bool).unwrap_or(false),
                schema: param.get("schema").cloned(),
                acl_binding: param
                    .get(ACL_BINDING_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
            merged.insert((name.to_string(), location), spec);
        }
    }
    merged.into_values().collect()
}

fn with_relative_server(document: &Value, servers: &[Server]) -> Value {
    let mut copy = document.clone();
    let Some(root) = copy.as_object_mut() else {
        return copy;
    };

    if servers.is_empty() {
        info!("No servers found in contract, added relative server for documentation");
        root.insert("servers".to_string(), serde_json::json!([{ "url": "/" }]));
    } else if !servers.iter().any(Server::is_local) {
        info!("No localhost or relative server found in contract, added one for documentation");
        let tail: Vec<&str> = servers[0].url.split('/').skip(3).collect();
        let relative = format!("/{}", tail.join("/"));
        if let Some(Value::Array(list)) = root.get_mut("servers") {
            list.push(serde_json::json!({ "url": relative }));
        }
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_document() -> Value {
        json!({
            "openapi": "3.0.0",
            "security": [{ "bearerAuth": [] }],
            "paths": {
                "/pets": {
                    "x-router-controller": "petsPathLevel",
                    "summary": "Pets",
                    "get": {
                        "operationId": "listPets",
                        "security": [],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {
                                    "application/json": { "schema": { "type": "array" } },
                                    "application/xml": {}
                                }
                            },
                            "default": { "description": "error" }
                        }
                    },
                    "post": {
                        "x-swagger-router-controller": "petsWriter",
                        "responses": { "201": { "description": "created" } }
                    }
                },
                "/users/{userId}": {
                    "parameters": [
                        { "name": "userId", "in": "path", "required": true, "x-acl-binding": "sub" }
                    ],
                    "get": {
                        "responses": { "2XX": { "description": "ok" } }
                    },
                    "delete": {
                        "parameters": [
                            { "name": "userId", "in": "path", "required": true }
                        ],
                        "responses": { "204": { "description": "gone" } }
                    }
                }
            },
            "components": {
                "securitySchemes": {
                    "bearerAuth": {
                        "type": "http",
                        "scheme": "bearer",
                        "bearerFormat": "JWT",
                        "x-acl-config": "grants.json"
                    },
                    "apiKey": { "type": "apiKey", "in": "header", "name": "X-Key" }
                }
            }
        })
    }

    fn create_test_contract() -> ContractDocument {
        ContractDocument::from_value(create_test_document()).unwrap()
    }

    #[test]
    fn test_operations_in_declaration_order() {
        let contract = create_test_contract();
        let ops: Vec<_> = contract
            .operations()
            .iter()
            .map(|o| format!("{} {}", o.method(), o.template()))
            .collect();
        assert_eq!(
            ops,
            vec!["GET /pets", "POST /pets", "GET /users/{userId}", "DELETE /users/{userId}"]
        );
        assert_eq!(contract.paths().collect::<Vec<_>>(), vec!["/pets", "/users/{userId}"]);
    }

    #[test]
    fn test_responses_and_content() {
        let contract = create_test_contract();
        let entry = contract.operation("/pets", &Method::GET).unwrap();
        let ok = &entry.responses()["200"];
        assert_eq!(ok.description(), Some("ok"));
        assert_eq!(
            ok.content().keys().collect::<Vec<_>>(),
            vec!["application/json", "application/xml"]
        );
        assert_eq!(ok.schema_for("application/json"), Some(&json!({ "type": "array" })));
        assert_eq!(ok.schema_for("application/xml"), None);
        assert!(entry.responses().contains_key("default"));
    }

    #[test]
    fn test_security_operation_level_overrides_top_level() {
        let contract = create_test_contract();
        let list = contract.operation("/pets", &Method::GET).unwrap();
        assert!(!list.has_security());

        let create = contract.operation("/pets", &Method::POST).unwrap();
        assert!(create.has_security());
        assert_eq!(
            create.security()[0].scheme_names().collect::<Vec<_>>(),
            vec!["bearerAuth"]
        );
    }

    #[test]
    fn test_router_hint_precedence() {
        let contract = create_test_contract();
        assert_eq!(
            contract.operation("/pets", &Method::GET).unwrap().router_hint(),
            Some("petsPathLevel")
        );
        assert_eq!(
            contract.operation("/pets", &Method::POST).unwrap().router_hint(),
            Some("petsWriter")
        );
        assert_eq!(
            contract
                .operation("/users/{userId}", &Method::GET)
                .unwrap()
                .router_hint(),
            None
        );
    }

    #[test]
    fn test_acl_bindings_merge() {
        let contract = create_test_contract();
        let get = contract.operation("/users/{userId}", &Method::GET).unwrap();
        assert_eq!(
            get.acl_bindings(),
            &[AclBinding {
                param: "userId".to_string(),
                claim: "sub".to_string()
            }]
        );

        let delete = contract.operation("/users/{userId}", &Method::DELETE).unwrap();
        assert!(delete.acl_bindings().is_empty());
    }

    #[test]
    fn test_parameters_and_request_body() {
        let contract = ContractDocument::from_value(json!({
            "paths": {
                "/pets/{petId}": {
                    "parameters": [
                        { "name": "petId", "in": "path", "schema": { "type": "string" } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer" } },
                        { "name": "bogus", "in": "body" }
                    ],
                    "put": {
                        "parameters": [
                            { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer" } },
                            { "name": "X-Trace", "in": "header", "required": true }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": { "schema": { "type": "object" } },
                                "text/plain": {}
                            }
                        },
                        "responses": { "204": { "description": "updated" } }
                    }
                }
            }
        }))
        .unwrap();

        let put = contract.operation("/pets/{petId}", &Method::PUT).unwrap();
        let params = put.parameters();
        assert_eq!(params.len(), 3);

        assert_eq!(params[0].name, "petId");
        assert_eq!(params[0].location, ParameterLocation::Path);
        assert!(params[0].required);
        assert_eq!(params[0].schema, Some(json!({ "type": "integer" })));

        assert_eq!(params[1].location, ParameterLocation::Query);
        assert!(!params[1].required);
        assert_eq!(params[2].location.to_string(), "header");

        let body = put.request_body().unwrap();
        assert!(body.required());
        assert_eq!(
            body.content().keys().collect::<Vec<_>>(),
            vec!["application/json", "text/plain"]
        );
        assert_eq!(body.content()["text/plain"], None);
    }

    #[test]
    fn test_rejects_malformed_request_body() {
        let err = ContractDocument::from_value(json!({
            "paths": { "/pets": { "post": { "requestBody": [], "responses": {} } } }
        }))
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidField {
                path: "/pets".to_string(),
                method: "POST".to_string(),
                field: "requestBody".to_string()
            }
        );
    }

    #[test]
    fn test_security_schemes() {
        let contract = create_test_contract();
        let bearer = contract.security_scheme("bearerAuth").unwrap();
        assert!(bearer.is_bearer_jwt());
        assert_eq!(bearer.acl_config(), Some(&json!("grants.json")));
        assert!(bearer.bearer_config().is_none());

        let key = contract.security_scheme("apiKey").unwrap();
        assert!(!key.is_bearer_jwt());
        assert_eq!(key.kind(), "apiKey");
    }

    #[test]
    fn test_source_document_is_not_mutated() {
        let document = create_test_document();
        let contract = ContractDocument::from_value(document.clone()).unwrap();
        assert_eq!(contract.document(), &document);
    }

    #[test]
    fn test_rejects_non_object_document() {
        assert_eq!(
            ContractDocument::from_value(json!([])).unwrap_err(),
            CoreError::NotAnObject
        );
    }

    #[test]
    fn test_rejects_missing_paths() {
        assert_eq!(
            ContractDocument::from_value(json!({ "openapi": "3.0.0" })).unwrap_err(),
            CoreError::MissingPaths
        );
    }

    #[test]
    fn test_rejects_non_object_operation() {
        let err = ContractDocument::from_value(json!({ "paths": { "/a": { "get": 5 } } })).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidOperation {
                path: "/a".to_string(),
                method: "GET".to_string()
            }
        );
    }

    #[test]
    fn test_ignores_non_operation_keys() {
        let contract = ContractDocument::from_value(json!({
            "paths": { "/a": { "parameters": [], "connect": {}, "x-note": 1, "get": {} } }
        }))
        .unwrap();
        assert_eq!(contract.operations().len(), 1);
    }

    #[test]
    fn test_base_path_from_servers() {
        let cases = [
            (json!([{ "url": "/api/v1/" }]), "/api/v1"),
            (json!([{ "url": "/api" }]), "/api"),
            (json!([{ "url": "http://example.com/v2" }]), "/v2"),
            (json!([{ "url": "https://example.com/" }]), ""),
            (json!([{ "url": "https://example.com" }]), ""),
            (json!([{ "url": "/" }]), ""),
        ];
        for (servers, expected) in cases {
            let contract =
                ContractDocument::from_value(json!({ "servers": servers, "paths": {} })).unwrap();
            assert_eq!(contract.base_path(), expected, "servers: {servers}");
        }

        let none = ContractDocument::from_value(json!({ "paths": {} })).unwrap();
        assert_eq!(none.base_path(), "");
    }

    #[test]
    fn test_frozen_document_adds_relative_server() {
        let contract = ContractDocument::from_value(json!({
            "servers": [{ "url": "https://api.example.com/v1" }],
            "paths": {}
        }))
        .unwrap();
        assert_eq!(
            contract.frozen_document()["servers"],
            json!([{ "url": "https://api.example.com/v1" }, { "url": "/v1" }])
        );
        assert_eq!(contract.servers().len(), 1);

        let bare = ContractDocument::from_value(json!({ "paths": {} })).unwrap();
        assert_eq!(bare.frozen_document()["servers"], json!([{ "url": "/" }]));

        let local = ContractDocument::from_value(json!({
            "servers": [{ "url": "http://localhost:8080" }],
            "paths": {}
        }))
        .unwrap();
        assert_eq!(local.frozen_document()["servers"].as_array().unwrap().len(), 1);
    }
}
