//! HTTP listener for request/response adapters.
//!
//! Binding is separate from serving so a bind failure surfaces while the
//! adapter is being constructed, before any dispatch starts.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{Router, extract::State, routing::post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use sluice_core::{TransportError, TransportResult};

pub use axum::body::Bytes;

/// Answers one HTTP request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Returns the response body for a request body.
    async fn on_request(&self, body: Bytes) -> String;
}

/// A bound, not yet serving, HTTP listener.
#[derive(Debug)]
pub struct HttpListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpListener {
    /// Binds `addr` (e.g. `0.0.0.0:8080`).
    pub async fn bind(addr: &str) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            TransportError::InvalidConfig(format!("failed to bind {addr}: {e}"))
        })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The actually bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves POST requests on `path` until `shutdown` is cancelled.
    pub async fn serve(
        self,
        path: &str,
        handler: Arc<dyn RequestHandler>,
        shutdown: CancellationToken,
    ) -> TransportResult<()> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let router = Router::new()
            .route(&path, post(http_handler))
            .with_state(handler);

        info!(addr = %self.local_addr, path = %path, "HTTP server listening");

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        match result {
            Ok(()) => {
                info!(addr = %self.local_addr, "HTTP server shut down");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "HTTP server error");
                Err(TransportError::Io(e.to_string()))
            }
        }
    }
}

/// HTTP POST handler.
async fn http_handler(State(handler): State<Arc<dyn RequestHandler>>, body: Bytes) -> String {
    trace!(len = body.len(), "Received HTTP POST");
    handler.on_request(body).await
}
