//! HTTP adapter over [`LedgerService`].

mod error;
mod handlers;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::LedgerService;

pub use error::ApiError;
pub use handlers::{AmountRequest, CreateAccountRequest};
pub use middleware::REQUEST_ID_HEADER;

/// Shared state handed to every handler.
pub type AppState = Arc<LedgerService>;

pub fn build_router(service: LedgerService) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/api/accounts/:id", get(handlers::get_account))
        .route("/api/accounts/:id/deposit", post(handlers::deposit))
        .route("/api/accounts/:id/withdraw", post(handlers::withdraw))
        .route(
            "/api/accounts/:id/transactions",
            get(handlers::transaction_history),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        // Outermost, so the trace span already sees the request id
        .layer(from_fn(middleware::request_id_middleware))
        .with_state(Arc::new(service))
}

/// Serve the API until Ctrl-C.
pub async fn serve(service: LedgerService, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    info!(%addr, "Listening");

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
