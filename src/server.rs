use axum::{
    http::StatusCode,
    middleware as axum_mw,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::metrics::stream;
use crate::middleware::instrument;
use crate::AppState;

/// Builds the service's own routes (local metrics views) with the
/// request hooks installed.
pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/", get(welcome))
        // ── Metrics ─────────────────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        .fallback(unknown_endpoint)
        // ── Provide shared state to all routes above ────────────
        .with_state(Arc::clone(&state));

    with_instrumentation(routes, state)
}

/// Wrap any router with the metrics hooks.
///
/// `track_active_caller` sits inside `instrument`; an auth layer that
/// inserts `CallerId` must be added to `router` before calling this.
pub fn with_instrumentation(router: Router, state: Arc<AppState>) -> Router {
    // Global middleware (applied bottom-up)
    router
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            instrument::track_active_caller,
        ))
        .layer(axum_mw::from_fn_with_state(state, instrument::instrument))
        .layer(CorsLayer::permissive())
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({
        "message": "welcome to JWT Pizza telemetry",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn unknown_endpoint() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "unknown endpoint" })),
    )
}
