//! Claims and grants sources.
//!
//! A source is either an inline JSON object or a location string:
//!
//! - `http://...` / `https://...`: fetched once
//! - `/abs/path.json`: read from disk
//! - anything else: read relative to the base directory (the working
//!   directory by default)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{AuthzError, AuthzResult};

/// Where a claims or grants document comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    /// A URL or file path.
    Location(String),
    /// The document itself.
    Inline(Value),
}

impl SourceSpec {
    /// Returns true for an `http(s)` location.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Location(l) if l.starts_with("http://") || l.starts_with("https://"))
    }
}

impl From<Value> for SourceSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::String(location) => Self::Location(location),
            other => Self::Inline(other),
        }
    }
}

impl From<&str> for SourceSpec {
    fn from(location: &str) -> Self {
        Self::Location(location.to_string())
    }
}

/// Resolves [`SourceSpec`]s into JSON documents.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
    base_dir: PathBuf,
}

impl SourceLoader {
    /// Creates a loader resolving relative paths against the working directory.
    pub fn new() -> AuthzResult<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| AuthzError::source_load(".", format!("failed to read working directory: {e}")))?;
        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a loader resolving relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Use a custom HTTP client for remote sources.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The directory relative locations are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads a source.
    pub async fn load(&self, spec: &SourceSpec) -> AuthzResult<Value> {
        match spec {
            SourceSpec::Inline(value) => Ok(value.clone()),
            SourceSpec::Location(location) if spec.is_remote() => self.fetch(location).await,
            SourceSpec::Location(location) if location.starts_with('/') => {
                Self::read(Path::new(location)).await
            }
            SourceSpec::Location(location) => Self::read(&self.base_dir.join(location)).await,
        }
    }

    async fn fetch(&self, url: &str) -> AuthzResult<Value> {
        info!(url, "loading source from url");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthzError::source_load(url, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthzError::source_load(
                url,
                format!("server returned status {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthzError::source_load(url, format!("failed to read response: {e}")))?;

        serde_json::from_slice(&body).map_err(|e| AuthzError::source_parse(url, e.to_string()))
    }

    async fn read(path: &Path) -> AuthzResult<Value> {
        let location = path.display().to_string();
        info!(path = %location, "loading source from file");

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| AuthzError::source_load(&location, format!("failed to read file: {e}")))?;

        serde_json::from_slice(&content).map_err(|e| AuthzError::source_parse(location, e.to_string()))
    }
}
