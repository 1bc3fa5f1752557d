//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::core::shared::state::AppState;

/// Reports database reachability. The in-memory store is always healthy.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let (backend, db_ok) = match state.conn.clone() {
        Some(pool) => {
            let reachable = tokio::task::spawn_blocking(move || pool.get().is_ok())
                .await
                .unwrap_or(false);
            ("postgres", reachable)
        }
        None => ("in-memory", true),
    };

    let status = if db_ok { "healthy" } else { "degraded" };
    let code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": "meetingserver",
            "version": env!("CARGO_PKG_VERSION"),
            "storage": backend,
            "database": db_ok
        })),
    )
}

pub async fn health_check_simple() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "meetingserver",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
