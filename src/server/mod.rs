//! HTTP route layer.
//!
//! Translates requests into parameterized statements, runs them through the
//! injected [`QueryExecutor`], and maps results and errors onto HTTP
//! responses.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::router;

use crate::error::{GatewayError, Result};
use crate::query::QueryExecutor;
use futures::FutureExt;
use std::net::SocketAddr;
use tracing::info;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub executor: QueryExecutor,
}

impl AppState {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

/// Serves the API on `bind` until Ctrl-C.
pub async fn serve(bind: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| GatewayError::internal(format!("failed to bind {bind}: {e}")))?;

    let local = listener
        .local_addr()
        .map_err(|e| GatewayError::internal(format!("failed to read bound address: {e}")))?;
    info!(address = %local, "Listening");

    let shutdown = tokio::signal::ctrl_c().map(|_| {
        info!("Shutdown signal received");
    });

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::internal(format!("server error: {e}")))
}
