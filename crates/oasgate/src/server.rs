//! HTTP/1 adapter.
//!
//! Serves a [`GatewayHandle`] with hyper. The adapter only owns the
//! sockets: it collects each request body, hands the request to the
//! current gateway and writes back whatever the pipeline produced.
//!
//! # Example
//!
//! ```rust,ignore
//! use oasgate::server::serve;
//! use tokio::net::TcpListener;
//!
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! serve(listener, handle, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! ```

use std::convert::Infallible;
use std::future::Future;

use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use oasgate_core::ErrorEnvelope;
use oasgate_middleware::{Request, Response, ResponseExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::GatewayResult;
use crate::handle::GatewayHandle;

/// Serves requests until `shutdown` completes, then waits for open
/// connections to finish their in-flight requests.
pub async fn serve<F>(listener: TcpListener, handle: GatewayHandle, shutdown: F) -> GatewayResult<()>
where
    F: Future<Output = ()> + Send,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Server listening on {}", addr);

    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };

                let handle = handle.clone();
                let service = service_fn(move |req: http::Request<Incoming>| {
                    let handle = handle.clone();
                    async move { Ok::<_, Infallible>(dispatch(&handle, req).await) }
                });
                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn);

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(remote = %remote_addr, error = %e, "connection closed with error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("Shutdown signal received, stopping server");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn dispatch(handle: &GatewayHandle, req: http::Request<Incoming>) -> Response {
    match collect(req).await {
        Ok(request) => handle.handle(request).await,
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            Response::envelope(
                StatusCode::BAD_REQUEST,
                &ErrorEnvelope::message("Failed to read request body"),
            )
        }
    }
}

async fn collect(req: http::Request<Incoming>) -> Result<Request, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(http::Request::from_parts(parts, Full::new(body)))
}
