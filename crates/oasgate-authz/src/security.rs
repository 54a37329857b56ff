//! Per-scheme security state built at startup.
//!
//! For every scheme declared under `components.securitySchemes`, the
//! registry holds the token verifier used to authenticate requests and the
//! expanded grants used to authorize them.

use std::sync::Arc;

use http::HeaderMap;
use indexmap::IndexMap;
use oasgate_core::{ContractDocument, OperationEntry, Principal, SecurityRequirement, SecurityScheme};
use oasgate_router::Params;
use serde_json::Value;
use tracing::{debug, info};

use crate::access::{check_access, AccessDecision};
use crate::error::{AuthzError, AuthzResult};
use crate::grants::{expand_grants, ExpandedGrants, GrantTable};
use crate::jwt::JwtVerifier;
use crate::source::{SourceLoader, SourceSpec};

/// Turns a credential into claims.
pub trait TokenVerifier: Send + Sync {
    /// Verifies the credential and returns its claims.
    ///
    /// Failures should be [`AuthzError::Unauthenticated`].
    fn verify(&self, token: &str) -> AuthzResult<Value>;
}

impl<F> TokenVerifier for F
where
    F: Fn(&str) -> AuthzResult<Value> + Send + Sync,
{
    fn verify(&self, token: &str) -> AuthzResult<Value> {
        self(token)
    }
}

/// Configured claims and grants sources, keyed by scheme name.
#[derive(Debug, Clone, Default)]
pub struct SecuritySources {
    /// Bearer configuration sources.
    pub security_files: IndexMap<String, SourceSpec>,
    /// Grant table sources.
    pub grants_files: IndexMap<String, SourceSpec>,
}

struct SchemeEntry {
    scheme: SecurityScheme,
    bearer_config: Option<Value>,
    grants: Option<ExpandedGrants>,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

/// Security state for every declared scheme.
pub struct SecurityRegistry {
    schemes: IndexMap<String, SchemeEntry>,
}

impl std::fmt::Debug for SecurityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in &self.schemes {
            map.entry(
                name,
                &format_args!(
                    "verifier: {}, grants: {}",
                    entry.verifier.is_some(),
                    entry.grants.is_some()
                ),
            );
        }
        map.finish()
    }
}

impl SecurityRegistry {
    /// A registry with no schemes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schemes: IndexMap::new(),
        }
    }

    /// Loads sources and builds verifiers and grants for the contract's schemes.
    ///
    /// Bearer-JWT schemes fall back to their `x-bearer-config` and
    /// `x-acl-config` extensions when `sources` names nothing for them.
    /// Custom verifiers take precedence over the built-in JWT verifier.
    pub async fn load(
        contract: &ContractDocument,
        sources: &SecuritySources,
        loader: &SourceLoader,
        verifiers: IndexMap<String, Arc<dyn TokenVerifier>>,
    ) -> AuthzResult<Self> {
        for name in sources.security_files.keys().chain(sources.grants_files.keys()).chain(verifiers.keys()) {
            if contract.security_scheme(name).is_none() {
                return Err(AuthzError::UnknownScheme { name: name.clone() });
            }
        }

        let mut verifiers = verifiers;
        let mut schemes = IndexMap::new();
        for (name, scheme) in contract.security_schemes() {
            let jwt = scheme.is_bearer_jwt();

            let bearer_source = sources
                .security_files
                .get(name)
                .cloned()
                .or_else(|| jwt.then(|| scheme.bearer_config().cloned().map(SourceSpec::from)).flatten());
            let grants_source = sources
                .grants_files
                .get(name)
                .cloned()
                .or_else(|| jwt.then(|| scheme.acl_config().cloned().map(SourceSpec::from)).flatten());

            let bearer_config = match &bearer_source {
                Some(source) => Some(loader.load(source).await?),
                None => None,
            };

            let grants = match &grants_source {
                Some(source) => {
                    let table = GrantTable::from_value(name, &loader.load(source).await?)?;
                    Some(expand_grants(contract.paths(), &table))
                }
                None => None,
            };

            let verifier = match (verifiers.swap_remove(name), &bearer_config) {
                (Some(custom), _) => Some(custom),
                (None, Some(config)) if jwt => {
                    Some(Arc::new(JwtVerifier::from_config(name, config)?) as Arc<dyn TokenVerifier>)
                }
                _ => None,
            };

            info!(
                scheme = %name,
                verifier = verifier.is_some(),
                grants = grants.is_some(),
                "security scheme initialized"
            );

            schemes.insert(
                name.clone(),
                SchemeEntry {
                    scheme: scheme.clone(),
                    bearer_config,
                    grants,
                    verifier,
                },
            );
        }

        Ok(Self { schemes })
    }

    /// Number of schemes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    /// Returns true if no scheme is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// The loaded bearer configuration of a scheme.
    #[must_use]
    pub fn bearer_config(&self, scheme: &str) -> Option<&Value> {
        self.schemes.get(scheme)?.bearer_config.as_ref()
    }

    /// The expanded grants of a scheme.
    #[must_use]
    pub fn grants(&self, scheme: &str) -> Option<&ExpandedGrants> {
        self.schemes.get(scheme)?.grants.as_ref()
    }

    /// Authenticates a request against an operation's security requirements.
    ///
    /// Requirements are alternatives. Every scheme inside a requirement must
    /// verify, and the principal carries the claims of the first one.
    pub fn authenticate(&self, requirements: &[SecurityRequirement], headers: &HeaderMap) -> AuthzResult<Principal> {
        let mut last_error = AuthzError::unauthenticated("No credentials provided");

        for requirement in requirements {
            if requirement.is_empty() {
                return Ok(Principal::new("", Value::Null));
            }

            match self.verify_requirement(requirement, headers) {
                Ok(principal) => return Ok(principal),
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    fn verify_requirement(&self, requirement: &SecurityRequirement, headers: &HeaderMap) -> AuthzResult<Principal> {
        let mut principal = None;

        for name in requirement.scheme_names() {
            let entry = self
                .schemes
                .get(name)
                .ok_or_else(|| AuthzError::unauthenticated(format!("Unknown security scheme {name}")))?;
            let verifier = entry
                .verifier
                .as_ref()
                .ok_or_else(|| AuthzError::unauthenticated(format!("No verifier for security scheme {name}")))?;
            let token = credential(&entry.scheme, headers)
                .ok_or_else(|| AuthzError::unauthenticated("No credentials provided"))?;

            let claims = verifier.verify(&token)?;
            debug!(scheme = %name, "credentials verified");
            principal.get_or_insert_with(|| Principal::new(name, claims));
        }

        principal.ok_or_else(|| AuthzError::unauthenticated("No credentials provided"))
    }

    /// Authorizes an authenticated principal for an operation.
    ///
    /// Schemes without a grant table allow every request.
    #[must_use]
    pub fn authorize(&self, principal: &Principal, operation: &OperationEntry, params: &Params) -> AccessDecision {
        match self.grants(principal.scheme()) {
            Some(grants) => check_access(grants, principal, operation, params),
            None => AccessDecision::Allow {
                role: String::new(),
            },
        }
    }
}

/// Extracts the credential a scheme expects from the request headers.
fn credential(scheme: &SecurityScheme, headers: &HeaderMap) -> Option<String> {
    match scheme.kind() {
        "http" => {
            let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
            let (kind, token) = value.split_once(' ')?;
            let expected = scheme.scheme().unwrap_or("bearer");
            kind.eq_ignore_ascii_case(expected).then(|| token.trim().to_string())
        }
        "apiKey" if scheme.api_key_location() == Some("header") => {
            let name = scheme.api_key_name()?;
            headers.get(name)?.to_str().ok().map(str::to_string)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn create_test_contract() -> ContractDocument {
        ContractDocument::from_value(json!({
            "paths": {
                "/pets": {
                    "get": {
                        "security": [{ "bearerAuth": [] }],
                        "responses": { "200": { "description": "ok" } }
                    }
                },
                "/stats": {
                    "get": {
                        "security": [{ "apiKey": [] }, { "bearerAuth": [] }],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            },
            "components": {
                "securitySchemes": {
                    "bearerAuth": {
                        "type": "http",
                        "scheme": "bearer",
                        "bearerFormat": "JWT",
                        "x-bearer-config": { "secret": "s3cr3t" },
                        "x-acl-config": { "user": { "pets": { "read:any": ["*"] } } }
                    },
                    "apiKey": { "type": "apiKey", "in": "header", "name": "X-API-Key" }
                }
            }
        }))
        .unwrap()
    }

    async fn create_test_registry(verifiers: IndexMap<String, Arc<dyn TokenVerifier>>) -> SecurityRegistry {
        let contract = create_test_contract();
        let loader = SourceLoader::with_base_dir("/nonexistent");
        SecurityRegistry::load(&contract, &SecuritySources::default(), &loader, verifiers)
            .await
            .unwrap()
    }

    fn bearer(claims: Value) -> HeaderMap {
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cr3t")).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_extensions_are_loaded() {
        let registry = create_test_registry(IndexMap::new()).await;
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.bearer_config("bearerAuth"), Some(&json!({ "secret": "s3cr3t" })));
        assert!(registry.grants("bearerAuth").unwrap().grant("user", "/pets").is_some());
        assert!(registry.grants("apiKey").is_none());
    }

    #[tokio::test]
    async fn test_authenticate_and_authorize() {
        let registry = create_test_registry(IndexMap::new()).await;
        let contract = create_test_contract();
        let operation = contract.operation("/pets", &Method::GET).unwrap();

        let principal = registry
            .authenticate(operation.security(), &bearer(json!({ "sub": "1", "role": "user" })))
            .unwrap();
        assert_eq!(principal.scheme(), "bearerAuth");
        assert!(registry.authorize(&principal, operation, &Params::new()).is_allowed());

        let guest = registry
            .authenticate(operation.security(), &bearer(json!({ "sub": "2", "role": "guest" })))
            .unwrap();
        assert!(!registry.authorize(&guest, operation, &Params::new()).is_allowed());
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let registry = create_test_registry(IndexMap::new()).await;
        let contract = create_test_contract();
        let operation = contract.operation("/pets", &Method::GET).unwrap();

        let err = registry.authenticate(operation.security(), &HeaderMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "No credentials provided");
    }

    #[tokio::test]
    async fn test_custom_verifier_for_api_key() {
        let mut verifiers: IndexMap<String, Arc<dyn TokenVerifier>> = IndexMap::new();
        verifiers.insert(
            "apiKey".to_string(),
            Arc::new(|key: &str| {
                if key == "k-123" {
                    Ok(json!({ "client": "ops" }))
                } else {
                    Err(AuthzError::unauthenticated("Invalid API key"))
                }
            }),
        );
        let registry = create_test_registry(verifiers).await;
        let contract = create_test_contract();
        let operation = contract.operation("/stats", &Method::GET).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("k-123"));
        let principal = registry.authenticate(operation.security(), &headers).unwrap();
        assert_eq!(principal.scheme(), "apiKey");
        assert!(registry.authorize(&principal, operation, &Params::new()).is_allowed());

        let principal = registry
            .authenticate(operation.security(), &bearer(json!({ "role": "user" })))
            .unwrap();
        assert_eq!(principal.scheme(), "bearerAuth");
    }

    #[tokio::test]
    async fn test_non_jwt_scheme_without_verifier() {
        let registry = create_test_registry(IndexMap::new()).await;
        let requirement = SecurityRequirement::new([("apiKey".to_string(), Vec::new())]);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("k-123"));
        let err = registry.authenticate(&[requirement], &headers).unwrap_err();
        assert!(err.to_string().contains("apiKey"));
    }

    #[tokio::test]
    async fn test_unknown_scheme_in_sources() {
        let contract = create_test_contract();
        let loader = SourceLoader::with_base_dir("/nonexistent");
        let mut sources = SecuritySources::default();
        sources
            .grants_files
            .insert("oauth".to_string(), SourceSpec::Inline(json!({})));

        let err = SecurityRegistry::load(&contract, &sources, &loader, IndexMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::UnknownScheme { name } if name == "oauth"));
    }

    #[tokio::test]
    async fn test_configured_source_overrides_extension() {
        let contract = create_test_contract();
        let loader = SourceLoader::with_base_dir("/nonexistent");
        let mut sources = SecuritySources::default();
        sources.grants_files.insert(
            "bearerAuth".to_string(),
            SourceSpec::Inline(json!({ "admin": { "pets": { "read:any": ["*"] } } })),
        );

        let registry = SecurityRegistry::load(&contract, &sources, &loader, IndexMap::new())
            .await
            .unwrap();
        let grants = registry.grants("bearerAuth").unwrap();
        assert!(grants.role("user").is_none());
        assert!(grants.grant("admin", "/pets").is_some());
    }
}
