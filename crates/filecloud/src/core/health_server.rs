//! Liveness endpoint for container orchestration
//!
//! Exposes `GET /healthz` on `PORT` (default 8000). Every other path answers 404.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Builds the health router.
pub fn router() -> Router {
    Router::new().route("/healthz", get(healthz_handler)).fallback(not_found_handler)
}

/// Start the health-check HTTP server
///
/// Runs until the listener fails; callers spawn it next to the dispatcher.
pub async fn start_health_server(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Starting health server on http://{}", addr);
    log::info!("  /healthz - Liveness check");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "OK")
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "text/plain")], "Not Found")
}
