//! Bearer JWT verification.
//!
//! The verifier is configured from a scheme's bearer configuration:
//!
//! ```json
//! { "issuer": "https://auth.example.com", "secret": "s3cr3t", "algorithm": "HS256" }
//! ```
//!
//! `publicKey` (PEM) may be given instead of `secret`. Without `algorithm`,
//! HS256 is used for secrets and RS256 for public keys.

use std::str::FromStr;

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AuthzError, AuthzResult};
use crate::security::TokenVerifier;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BearerConfig {
    issuer: Option<String>,
    secret: Option<String>,
    public_key: Option<String>,
    algorithm: Option<String>,
}

/// Verifies HMAC or public-key signed JWTs.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("issuer", &self.validation.iss)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Builds a verifier from a bearer configuration object.
    ///
    /// `scheme` only labels errors.
    pub fn from_config(scheme: &str, config: &Value) -> AuthzResult<Self> {
        let invalid = |message: String| AuthzError::BearerConfig {
            scheme: scheme.to_string(),
            message,
        };

        let config = BearerConfig::deserialize(config).map_err(|e| invalid(e.to_string()))?;

        let algorithm = match (&config.algorithm, &config.public_key) {
            (Some(name), _) => {
                Algorithm::from_str(name).map_err(|_| invalid(format!("unsupported algorithm {name}")))?
            }
            (None, Some(_)) => Algorithm::RS256,
            (None, None) => Algorithm::HS256,
        };

        let key = match (&config.secret, &config.public_key) {
            (_, Some(pem)) => public_key(algorithm, pem.as_bytes()).map_err(|e| invalid(e.to_string()))?,
            (Some(secret), None) => DecodingKey::from_secret(secret.as_bytes()),
            (None, None) => return Err(invalid("either secret or publicKey is required".to_string())),
        };

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }
}

fn public_key(algorithm: Algorithm, pem: &[u8]) -> jsonwebtoken::errors::Result<DecodingKey> {
    match algorithm {
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
        _ => DecodingKey::from_rsa_pem(pem),
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> AuthzResult<Value> {
        decode::<Value>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "JWT validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthzError::unauthenticated("Token expired"),
                    ErrorKind::InvalidIssuer => AuthzError::unauthenticated("Invalid token issuer"),
                    _ => AuthzError::unauthenticated("Invalid token"),
                }
            })
    }
}
