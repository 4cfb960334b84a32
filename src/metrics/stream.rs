//! Local, read-only views of the collector. Neither endpoint resets
//! anything; the backend export runs on its own schedule.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

use super::collector::MetricsSnapshot;
use crate::AppState;

/// SSE event name carried by every frame of the live feed
pub const LIVE_EVENT: &str = "metrics";

/// How often the live feed pushes a frame
const LIVE_PERIOD: Duration = Duration::from_millis(500);

/// `GET /api/metrics`: the full snapshot, latency windows included.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// `GET /api/metrics/stream`: a `metrics` event with the collector's
/// [`LiveView`](super::LiveView) every 500 ms, starting immediately.
pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut ticker = tokio::time::interval(LIVE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let frames = IntervalStream::new(ticker)
        .map(move |_| Event::default().event(LIVE_EVENT).json_data(state.metrics.live_view()));

    Sse::new(frames).keep_alive(KeepAlive::default())
}
