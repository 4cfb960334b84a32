use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::metrics::LatencyCategory;
use crate::AppState;

/// Identity of the authenticated caller.
///
/// The auth layer inserts this as a request extension once it has resolved
/// who is calling; [`track_active_caller`] picks it up from there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// Request-level metrics hook. Install it outermost so it sees everything.
///
///   * counts the request by method before the handler runs
///   * records elapsed milliseconds once the response exists,
///     classified as an order write or a plain request
///   * adds a `Server-Timing` header with the same duration
pub async fn instrument(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    state.metrics.increment_request(method.as_str());

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let millis = whole_millis(elapsed);

    let category = LatencyCategory::classify(method.as_str(), &path);
    state.metrics.record_latency(category, millis);

    // ── Inject response header ──────────────────────────────────
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // Skip the SSE feed, it would log forever
    if path.starts_with("/api/") && !path.contains("/stream") {
        debug!(
            %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = millis,
            "request"
        );
    }

    response
}

/// Saturates instead of truncating the `u128`.
fn whole_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Count the caller as active once identity has been resolved.
/// Requests without a [`CallerId`] pass through untouched.
pub async fn track_active_caller(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(CallerId(id)) = req.extensions().get::<CallerId>() {
        state.metrics.track_active_entity(id);
    }
    next.run(req).await
}
