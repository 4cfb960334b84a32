//! In-process telemetry for the pizza service.
//!
//! Request hooks feed a shared [`metrics::MetricsCollector`]; a sampler
//! keeps host CPU / memory fresh; an exporter snapshots the collector on a
//! fixed period and pushes one gauge per metric to the ingestion backend.
//! Everything here is fail-open: nothing blocks or errors the request path.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod middleware;
pub mod sampler;
pub mod server;
pub mod tasks;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics engine — hooks push samples, the exporter and the
    /// local endpoints read snapshots.
    pub metrics: Arc<metrics::MetricsCollector>,
}
