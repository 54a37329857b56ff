//! Shared, reloadable access to the current gateway.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use oasgate_middleware::{Request, Response};

use crate::error::GatewayResult;
use crate::gateway::{Gateway, GatewayBuilder};

/// Cloneable handle to the active [`Gateway`].
///
/// Each request takes a snapshot of the current gateway and runs to
/// completion on it. [`reload`](Self::reload) builds a complete new gateway
/// and swaps it in; requests already in flight keep the old one. When
/// reloads race, the last swap wins.
///
/// # Example
///
/// ```rust,ignore
/// let handle = GatewayHandle::new(gateway);
/// let response = handle.handle(request).await;
///
/// handle.reload(Gateway::builder(new_contract).config(config)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    current: Arc<RwLock<Arc<Gateway>>>,
}

impl GatewayHandle {
    /// Wraps an initialized gateway.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(gateway))),
        }
    }

    /// The gateway new requests are served by.
    #[must_use]
    pub fn current(&self) -> Arc<Gateway> {
        Arc::clone(&self.current.read())
    }

    /// Swaps in `gateway`, returning the one it replaced.
    pub fn replace(&self, gateway: Gateway) -> Arc<Gateway> {
        std::mem::replace(&mut *self.current.write(), Arc::new(gateway))
    }

    /// Builds a new gateway and swaps it in.
    ///
    /// On error the current gateway stays active.
    pub async fn reload(&self, builder: GatewayBuilder) -> GatewayResult<()> {
        let gateway = builder.build().await?;
        let operations = gateway.contract().operations().len();
        self.replace(gateway);
        info!(operations, "gateway reloaded");
        Ok(())
    }

    /// Handles one request on the current gateway.
    pub async fn handle(&self, request: Request) -> Response {
        let gateway = self.current();
        gateway.handle(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_contract(path: &str) -> serde_json::Value {
        json!({
            "openapi": "3.0.3",
            "info": { "title": "Ping", "version": "1.0.0" },
            "paths": {
                path: { "get": {
                    "operationId": "ping",
                    "responses": { "204": { "description": "pong" } }
                } }
            }
        })
    }

    async fn create_test_gateway(path: &str) -> Gateway {
        let mut config = oasgate_config::GatewayConfig::default();
        config.router.check_controllers = false;
        Gateway::builder(create_test_contract(path))
            .config(config)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_replace_keeps_old_snapshot() {
        let handle = GatewayHandle::new(create_test_gateway("/a").await);
        let before = handle.current();

        let previous = handle.replace(create_test_gateway("/b").await);
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!Arc::ptr_eq(&before, &handle.current()));
        assert!(before.contract().operation("/a", &http::Method::GET).is_some());
        assert!(handle.current().contract().operation("/b", &http::Method::GET).is_some());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current() {
        let handle = GatewayHandle::new(create_test_gateway("/a").await);
        let before = handle.current();

        let result = handle.reload(Gateway::builder(json!({ "openapi": "3.0.0" }))).await;
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &handle.current()));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let handle = GatewayHandle::new(create_test_gateway("/a").await);
        let clone = handle.clone();

        let mut config = oasgate_config::GatewayConfig::default();
        config.router.check_controllers = false;
        clone
            .reload(Gateway::builder(create_test_contract("/b")).config(config))
            .await
            .unwrap();
        assert!(handle.current().contract().operation("/b", &http::Method::GET).is_some());
    }
}
