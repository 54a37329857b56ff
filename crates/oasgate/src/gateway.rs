//! Gateway assembly.
//!
//! A [`Gateway`] is everything built once from a contract and a
//! configuration: the route table, compiled request and response schemas,
//! expanded grants, the controller table and the docs snapshot. Requests
//! share it read-only.
//!
//! ```text
//!  GatewayConfig ─┐
//!  contract JSON ─┼─► check_contract (OpenAPI 3.0 schema)
//!  controllers ───┤     ─► ContractDocument ─► ResponseValidator, RequestValidator
//!  verifiers ─────┘                         ─► SecurityRegistry (load sources, expand grants)
//!                                           ─► OperationDispatcher (check_all)
//!                                                   │
//!                                                   ▼
//!                         Pipeline: RouteResolution → Authentication → Authorization
//!                                   → RequestValidation → Dispatch
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use indexmap::IndexMap;
use oasgate_authz::{SecurityRegistry, SecuritySources, SourceLoader, SourceSpec, TokenVerifier};
use oasgate_config::GatewayConfig;
use oasgate_core::{ContractDocument, CoreError, GateError};
use oasgate_middleware::{
    Authentication, Authorization, BoxFuture, ControllerRegistry, Dispatch, Endpoint,
    MiddlewareContext, OperationDispatcher, Pipeline, PipelineState, Request, RequestValidation,
    Response, ResponseExt, RouteResolution,
};
use oasgate_sentinel::{
    check_contract, RequestValidator, ResponseValidator, ValidationConfig, DEFAULT_CONTENT_TYPE,
};
use oasgate_telemetry::{log_request_complete, log_request_start};
use serde_json::Value;
use tracing::{error, info};

use crate::error::GatewayResult;

/// An initialized gateway.
///
/// # Example
///
/// ```rust,ignore
/// use oasgate::prelude::*;
///
/// let gateway = Gateway::builder(contract)
///     .config(GatewayConfig::production())
///     .controllers(ControllerRegistry::new().register("PetsController", pets))
///     .build()
///     .await?;
///
/// let response = gateway.handle(request).await;
/// ```
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    contract: Arc<ContractDocument>,
    pipeline: Pipeline,
    docs: Option<DocsEndpoint>,
}

#[derive(Debug)]
struct DocsEndpoint {
    path: String,
    body: Bytes,
}

impl Gateway {
    /// Starts building a gateway for a dereferenced contract.
    #[must_use]
    pub fn builder(contract: Value) -> GatewayBuilder {
        GatewayBuilder::new(contract)
    }

    /// Builds a gateway.
    ///
    /// Every failure here is fatal: malformed contract, invalid
    /// configuration, uncompilable schema, unloadable security source or,
    /// with `router.check_controllers`, an operation without a handler.
    pub async fn initialize(
        config: GatewayConfig,
        contract: Value,
        controllers: ControllerRegistry,
        verifiers: IndexMap<String, Arc<dyn TokenVerifier>>,
    ) -> GatewayResult<Self> {
        GatewayBuilder::new(contract)
            .config(config)
            .controllers(controllers)
            .verifiers(verifiers)
            .build()
            .await
    }

    /// The configuration the gateway was built with.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The loaded contract.
    #[must_use]
    pub fn contract(&self) -> &Arc<ContractDocument> {
        &self.contract
    }

    /// The request pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Where the contract is served, if the docs endpoint is enabled.
    #[must_use]
    pub fn docs_path(&self) -> Option<&str> {
        self.docs.as_ref().map(|docs| docs.path.as_str())
    }

    /// Handles one request.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = MiddlewareContext::new(request.method().clone(), request.uri().path());
        let request_id = ctx.request_id();
        log_request_start!(request_id, request.method(), request.uri().path());

        let response = match self.docs_response(&request) {
            Some(response) => {
                ctx.enter(PipelineState::Sent);
                response
            }
            None => self.pipeline.process(&mut ctx, request).await,
        };

        let duration_ms = u64::try_from(ctx.request().elapsed().as_millis()).unwrap_or(u64::MAX);
        log_request_complete!(request_id, response.status().as_u16(), duration_ms);
        response
    }

    fn docs_response(&self, request: &Request) -> Option<Response> {
        let docs = self.docs.as_ref()?;
        if request.method() != Method::GET || request.uri().path() != docs.path {
            return None;
        }
        Some(Response::with_body(
            StatusCode::OK,
            DEFAULT_CONTENT_TYPE,
            docs.body.clone(),
        ))
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    contract: Value,
    config: GatewayConfig,
    controllers: ControllerRegistry,
    verifiers: IndexMap<String, Arc<dyn TokenVerifier>>,
    loader: Option<SourceLoader>,
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("config", &self.config)
            .field("controllers", &self.controllers.len())
            .field("verifiers", &self.verifiers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl GatewayBuilder {
    /// Creates a builder with the default configuration and no controllers.
    #[must_use]
    pub fn new(contract: Value) -> Self {
        Self {
            contract,
            config: GatewayConfig::default(),
            controllers: ControllerRegistry::new(),
            verifiers: IndexMap::new(),
            loader: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the controller table.
    #[must_use]
    pub fn controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = controllers;
        self
    }

    /// Registers a token verifier for a security scheme.
    #[must_use]
    pub fn verifier(mut self, scheme: impl Into<String>, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifiers.insert(scheme.into(), verifier);
        self
    }

    /// Replaces all token verifiers.
    #[must_use]
    pub fn verifiers(mut self, verifiers: IndexMap<String, Arc<dyn TokenVerifier>>) -> Self {
        self.verifiers = verifiers;
        self
    }

    /// Sets the loader for claims and grants sources.
    ///
    /// Defaults to one resolving relative paths against the working directory.
    #[must_use]
    pub fn source_loader(mut self, loader: SourceLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Builds the gateway.
    pub async fn build(self) -> GatewayResult<Gateway> {
        let Self {
            contract,
            config,
            controllers,
            verifiers,
            loader,
        } = self;

        config.validate()?;
        let parsed = ContractDocument::from_value(contract.clone())?;
        let conformance = check_contract(&contract)?;
        if !conformance.valid {
            let errors: Vec<String> = conformance.errors.iter().map(ToString::to_string).collect();
            for violation in &errors {
                error!(violation = %violation, "contract does not conform to OpenAPI 3.0");
            }
            return Err(CoreError::SchemaViolation { errors }.into());
        }
        info!("Valid specification file");
        let contract = Arc::new(parsed);
        info!(
            operations = contract.operations().len(),
            base_path = %contract.base_path(),
            "contract loaded"
        );

        let validation = ValidationConfig {
            enabled: config.validator.enabled,
            strict: config.validator.strict,
            ignore_unknown_formats: config.validator.ignore_unknown_formats,
        };
        let validator = if validation.enabled {
            Some(Arc::new(ResponseValidator::from_contract(&contract, validation)?))
        } else {
            None
        };
        let request_validation = if config.validator.requests {
            let validator = RequestValidator::from_contract(&contract, validation.ignore_unknown_formats)?;
            Some(RequestValidation::new(Arc::new(validator)))
        } else {
            None
        };

        let security = &config.security;
        let registry = if security.oas_security || security.oas_auth {
            let loader = match loader {
                Some(loader) => loader,
                None => SourceLoader::new()?,
            };
            let sources = SecuritySources {
                security_files: to_sources(&security.security_files),
                grants_files: to_sources(&security.grants_files),
            };
            SecurityRegistry::load(&contract, &sources, &loader, verifiers).await?
        } else {
            SecurityRegistry::empty()
        };
        let registry = Arc::new(registry);

        let builder = if config.router.enabled {
            let dispatcher = OperationDispatcher::new(controllers);
            if config.router.check_controllers {
                dispatcher.check_all(&contract)?;
            }
            Pipeline::builder(Dispatch::new(dispatcher, validator))
        } else {
            info!("router disabled, operations will not be dispatched");
            Pipeline::builder(Unrouted)
        };
        let builder = builder
            .stage(RouteResolution::new(Arc::clone(&contract)))
            .stage_if(security.oas_security, || Authentication::new(Arc::clone(&registry)))
            .stage_if(security.oas_auth, || Authorization::new(Arc::clone(&registry)));
        let pipeline = match request_validation {
            Some(stage) => builder.stage(stage),
            None => builder,
        }
        .build();
        info!(stages = ?pipeline.stage_names(), "pipeline assembled");

        let docs = config.docs.endpoint().map(|path| {
            info!(path = %path, "serving contract documentation");
            DocsEndpoint {
                path,
                body: Bytes::from(contract.frozen_document().to_string()),
            }
        });

        Ok(Gateway {
            config,
            contract,
            pipeline,
            docs,
        })
    }
}

fn to_sources(files: &IndexMap<String, Value>) -> IndexMap<String, SourceSpec> {
    files
        .iter()
        .map(|(scheme, source)| (scheme.clone(), SourceSpec::from(source.clone())))
        .collect()
}

/// Endpoint used when the router is disabled.
struct Unrouted;

impl Endpoint for Unrouted {
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, _request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            ctx.enter(PipelineState::Sent);
            let message = format!("Cannot {} {}", ctx.request().method(), ctx.request().path());
            Response::from_gate_error(&GateError::not_found(message))
        })
    }
}
