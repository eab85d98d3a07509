//! HTTP server lifecycle.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use burrow_core::StoreConfig;
use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::error::ServerError;
use crate::routes::handle;
use crate::state::AppState;

/// A running API server.
pub struct ApiServer {
    /// The actual bound address.
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    /// Open the store and start serving it on the configured address.
    pub async fn start(config: &StoreConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(config)?;
        let addr = SocketAddr::new(config.bind_address, config.port);
        Self::start_with_state(state, addr).await
    }

    /// Start serving prepared state on `addr` (port 0 picks a free port).
    pub async fn start_with_state(state: AppState, addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;
        info!(
            addr = %actual_addr,
            root = %state.engine.resolver().root().display(),
            archives = state.engine.archives().is_available(),
            "Starting API server"
        );

        let state = Arc::new(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            tokio::select! {
                () = run_server(listener, state) => {
                    debug!("Server loop ended");
                }
                _ = shutdown_rx => {
                    info!("Received shutdown signal");
                }
            }
        });

        Ok(Self {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Base URL of this server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until the server task ends on its own.
    pub async fn wait(mut self) {
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
    }

    /// Stop the server.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!("API server stopped");
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

async fn run_server(listener: TcpListener, state: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(handle(&state, req).await) }
                    });

                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        warn!(peer = %peer_addr, error = %e, "HTTP connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
