//! Operation dispatch.
//!
//! Handlers are registered up front in a [`ControllerRegistry`]: controller
//! name → [`Controller`], and within a controller, handler name →
//! [`HandlerFn`]. The [`OperationDispatcher`] finds the handler for a
//! contract operation by trying three controllers in turn:
//!
//! 1. the router hint (`x-router-controller` / `x-swagger-router-controller`)
//! 2. the name generated from the path (`/pets/{id}` → `PetsController`)
//! 3. `Default`
//!
//! Inside a controller the handler is the operationId, or the name generated
//! from path and verb (`/pets/{id}` GET → `funcPetsGET`).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::header::AsHeaderName;
use http::{HeaderMap, Method};
use indexmap::IndexMap;
use oasgate_core::{ContractDocument, OperationEntry, Principal, RequestContext, RequestId};
use oasgate_router::Params;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::middleware::BoxFuture;
use crate::responder::Responder;

/// Name of the fallback controller.
pub const DEFAULT_CONTROLLER: &str = "Default";

/// Future returned by handlers.
pub type HandlerFuture = BoxFuture<'static, Result<(), HandlerError>>;

/// An operation handler.
pub type HandlerFn = Arc<dyn Fn(OperationRequest, Responder) -> HandlerFuture + Send + Sync>;

/// Result type for dispatch resolution.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// How [`generate_name`] shapes its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMode {
    /// Normalize an identifier: separators are dropped and the following
    /// letter is capitalized.
    Plain,
    /// PascalCase the literal path segments and append `Controller`.
    Controller,
    /// PascalCase the literal path segments and prepend `func`.
    Function,
}

/// Derives a controller or handler name.
///
/// ```
/// use oasgate_middleware::{generate_name, NameMode};
///
/// assert_eq!(generate_name("/pets/{id}", NameMode::Controller), "PetsController");
/// assert_eq!(generate_name("/pets/{id}", NameMode::Function), "funcPets");
/// assert_eq!(generate_name("show-pet-by-id", NameMode::Plain), "showPetById");
/// ```
#[must_use]
pub fn generate_name(input: &str, mode: NameMode) -> String {
    match mode {
        NameMode::Plain => camel_case(input, false),
        NameMode::Controller => format!("{}Controller", pascal_path(input)),
        NameMode::Function => format!("func{}", pascal_path(input)),
    }
}

fn pascal_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !(segment.starts_with('{') && segment.ends_with('}')))
        .map(|segment| camel_case(segment, true))
        .collect()
}

fn camel_case(input: &str, upper_first: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = upper_first;
    for c in input.chars() {
        if c.is_alphanumeric() || c == '_' {
            if upper_next {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else {
            upper_next = upper_first || !out.is_empty();
        }
    }
    out
}

/// Error returned by a handler.
///
/// The pipeline answers 500 unless the handler already sent a response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl HandlerError {
    /// Creates an error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping a source error.
    pub fn with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(source: anyhow::Error) -> Self {
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Errors resolving an operation to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// None of the candidate controllers is registered.
    #[error("no controller found for {method} {path} (tried {})", .attempted.join(", "))]
    ControllerNotFound {
        /// Contract path template.
        path: String,
        /// HTTP method.
        method: String,
        /// Controller names looked up.
        attempted: Vec<String>,
    },

    /// A controller exists but none defines the handler.
    #[error("no handler found for {method} {path} (tried {})", .attempted.join(", "))]
    HandlerNotFound {
        /// Contract path template.
        path: String,
        /// HTTP method.
        method: String,
        /// `Controller.handler` pairs looked up.
        attempted: Vec<String>,
    },
}

/// The request as seen by a handler.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    context: RequestContext,
    headers: HeaderMap,
    query: Option<String>,
    body: Bytes,
}

impl OperationRequest {
    /// Creates a handler request.
    #[must_use]
    pub fn new(context: RequestContext, headers: HeaderMap, query: Option<String>, body: Bytes) -> Self {
        Self {
            context,
            headers,
            query,
            body,
        }
    }

    /// The request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.context.request_id()
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.context.method()
    }

    /// The request path, without query.
    #[must_use]
    pub fn path(&self) -> &str {
        self.context.path()
    }

    /// The raw query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header as text.
    #[must_use]
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        self.context.params()
    }

    /// A single path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.context.params().get(name)
    }

    /// The raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The authenticated principal.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.context.principal()
    }

    /// Verified token claims.
    #[must_use]
    pub fn claims(&self) -> Option<&Value> {
        self.context.principal().map(Principal::claims)
    }

    /// The resolved operation.
    #[must_use]
    pub fn operation(&self) -> Option<&Arc<OperationEntry>> {
        self.context.operation()
    }

    /// The full request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// A named set of handlers.
#[derive(Clone, Default)]
pub struct Controller {
    handlers: IndexMap<String, HandlerFn>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Controller {
    /// Creates an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler.
    ///
    /// # Example
    ///
    /// ```
    /// use oasgate_middleware::Controller;
    /// use serde_json::json;
    ///
    /// let pets = Controller::new().handler("showPetById", |req, res| async move {
    ///     let id = req.param("id").unwrap_or_default().to_string();
    ///     res.send(json!({ "id": id })).ok();
    ///     Ok(())
    /// });
    /// assert!(pets.contains("showPetById"));
    /// ```
    #[must_use]
    pub fn handler<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(OperationRequest, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handler: HandlerFn =
            Arc::new(move |req: OperationRequest, res: Responder| -> HandlerFuture { Box::pin(handler(req, res)) });
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Returns a handler by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HandlerFn> {
        self.handlers.get(name)
    }

    /// Returns true if the handler exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Handler names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Controllers by name.
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    controllers: IndexMap<String, Controller>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller, replacing any previous one with that name.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, controller: Controller) -> Self {
        self.controllers.insert(name.into(), controller);
        self
    }

    /// Returns a controller by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Controller> {
        self.controllers.get(name)
    }

    /// Number of controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns true if no controller is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

/// A handler found for an operation.
#[derive(Clone)]
pub struct ResolvedHandler {
    /// Controller it was found in.
    pub controller: String,
    /// Handler name within the controller.
    pub name: String,
    /// The handler.
    pub handler: HandlerFn,
}

impl fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("controller", &self.controller)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Finds handlers for contract operations.
#[derive(Debug, Clone, Default)]
pub struct OperationDispatcher {
    registry: Arc<ControllerRegistry>,
}

impl OperationDispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: ControllerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The controllers this dispatcher resolves against.
    #[must_use]
    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Controller names to try for `operation`, in order, without repeats.
    #[must_use]
    pub fn candidate_controllers(operation: &OperationEntry) -> Vec<String> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(hint) = operation.router_hint() {
            candidates.push(generate_name(hint, NameMode::Plain));
        }
        candidates.push(generate_name(operation.template(), NameMode::Controller));
        candidates.push(DEFAULT_CONTROLLER.to_string());

        let mut seen = Vec::with_capacity(candidates.len());
        candidates.retain(|name| {
            if seen.contains(name) {
                false
            } else {
                seen.push(name.clone());
                true
            }
        });
        candidates
    }

    /// Handler names to try within a controller, in order.
    #[must_use]
    pub fn candidate_handlers(operation: &OperationEntry) -> Vec<String> {
        let generated = format!(
            "{}{}",
            generate_name(operation.template(), NameMode::Function),
            operation.method().as_str().to_uppercase()
        );
        match operation.operation_id() {
            Some(id) => {
                let id = generate_name(id, NameMode::Plain);
                if id == generated {
                    vec![id]
                } else {
                    vec![id, generated]
                }
            }
            None => vec![generated],
        }
    }

    /// Resolves the handler for `operation`.
    ///
    /// Controllers are tried in [`candidate_controllers`](Self::candidate_controllers)
    /// order and the first registered one is authoritative: its handlers
    /// are looked up and a miss there does not fall through to later
    /// candidates.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ControllerNotFound`] if no candidate
    /// controller is registered, or [`DispatchError::HandlerNotFound`] if
    /// the resolved controller lacks every candidate handler.
    pub fn resolve(&self, operation: &OperationEntry) -> DispatchResult<ResolvedHandler> {
        let controllers = Self::candidate_controllers(operation);
        let path = operation.template().to_string();
        let method = operation.method().as_str().to_uppercase();

        let Some((controller_name, controller)) = controllers.iter().find_map(|name| {
            let found = self.registry.get(name);
            if found.is_none() {
                debug!(
                    controller = %name,
                    template = operation.template(),
                    "controller not registered"
                );
            }
            found.map(|controller| (name, controller))
        }) else {
            return Err(DispatchError::ControllerNotFound {
                path,
                method,
                attempted: controllers,
            });
        };

        let handlers = Self::candidate_handlers(operation);
        for handler_name in &handlers {
            if let Some(handler) = controller.get(handler_name) {
                return Ok(ResolvedHandler {
                    controller: controller_name.clone(),
                    name: handler_name.clone(),
                    handler: Arc::clone(handler),
                });
            }
        }

        Err(DispatchError::HandlerNotFound {
            path,
            method,
            attempted: handlers
                .iter()
                .map(|handler_name| format!("{controller_name}.{handler_name}"))
                .collect(),
        })
    }

    /// Resolves every operation in the contract, failing on the first miss.
    ///
    /// # Errors
    ///
    /// Returns the first [`DispatchError`] in contract order.
    pub fn check_all(&self, contract: &ContractDocument) -> DispatchResult<()> {
        for operation in contract.operations() {
            let resolved = self.resolve(operation)?;
            info!(
                http.method = %operation.method(),
                template = operation.template(),
                controller = %resolved.controller,
                handler = %resolved.name,
                "controller check passed"
            );
        }
        Ok(())
    }
}
