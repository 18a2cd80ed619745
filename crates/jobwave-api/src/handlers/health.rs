//! Banner and probe handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// Root banner.
pub async fn root() -> &'static str {
    "Job Wave server is running"
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe. 503 while the document store is unreachable.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "ready", "checks": {"store": {"status": "ok"}}})),
        ),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            let detail = if state.config.is_production() {
                "store unreachable".to_string()
            } else {
                e.to_string()
            };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "checks": {"store": {"status": "error", "error": detail}},
                })),
            )
        }
    }
}
