//! HTTP server module
//!
//! A thin hyper server whose handlers emit telemetry through the injected
//! [`TelemetryRegistry`]. The server never owns or shuts down providers; that
//! belongs to the [`TelemetryGuard`](crate::telemetry::TelemetryGuard) held by
//! `main`.

pub mod handlers;
pub mod instruments;

use crate::config::ServerConfig;
use crate::telemetry::TelemetryRegistry;
use bytes::Bytes;
use handlers::AppState;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Server error: {0}")]
    RuntimeError(String),
}

/// HTTP Server
pub struct Server {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: ServerConfig, registry: Arc<TelemetryRegistry>) -> Result<Self, ServerError> {
        let addr: SocketAddr = config
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("{}: {}", config.address, e)))?;

        Ok(Self {
            addr,
            state: Arc::new(AppState::new(registry)),
            shutdown_tx: None,
            server_handle: None,
        })
    }

    /// Start accepting connections in the background
    ///
    /// Returns the actual bound address (useful when using port 0)
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        let listener = TcpListener::bind(self.addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            accept_loop(listener, state, shutdown_rx).await;
        });
        self.server_handle = Some(handle);

        info!("Listening on {}", addr);
        Ok(addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
    }

    /// Run the server until Ctrl-C
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.start().await?;

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| ServerError::RuntimeError(e.to_string()))?;

        info!("Shutting down server");
        self.shutdown().await;
        Ok(())
    }
}

/// Run the HTTP accept loop
async fn accept_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let io = TokioIo::new(stream);
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = Arc::clone(&state);
                                async move { handle_request(req, state).await }
                            });
                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                debug!(%peer, error = %e, "Connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        debug!(error = %e, "Failed to accept connection");
                        continue;
                    }
                }
            }
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(handlers::route(req.method(), req.uri().path(), &state))
}
