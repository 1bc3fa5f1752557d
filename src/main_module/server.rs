//! HTTP server initialization and routing

use axum::extract::DefaultBodyLimit;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::shared::state::AppState;
use crate::meeting_requests::configure_meeting_requests_routes;

use super::{health_check, health_check_simple, shutdown_signal};

/// Multipart framing allowance on top of the largest accepted file.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(app_state: Arc<AppState>, max_file_size: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check_simple))
        .merge(configure_meeting_requests_routes())
        .layer(DefaultBodyLimit::max(max_file_size + UPLOAD_OVERHEAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_axum_server(app: Router, bind_address: &str) -> std::io::Result<()> {
    let listener = match tokio::net::TcpListener::bind(bind_address).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                bind_address, e
            );
            return Err(e);
        }
    };

    info!("Meeting request server listening on {}", bind_address);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
