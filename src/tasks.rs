//! Lifecycle of the background loops: system sampler, exporter, and the
//! active-user window. All three share one shutdown channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::export::{Exporter, Transport};
use crate::metrics::MetricsCollector;
use crate::sampler::SystemSampler;

/// Running background loops. Dropping this without `shutdown()` aborts them.
pub struct BackgroundTasks {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Start every periodic loop on the current runtime.
    pub fn spawn<T: Transport>(
        collector: Arc<MetricsCollector>,
        config: Arc<TelemetryConfig>,
        transport: T,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);

        let sampler = SystemSampler::new(Arc::clone(&collector));
        let exporter = Exporter::new(
            Arc::clone(&collector),
            Arc::clone(&config),
            Arc::new(transport),
        );

        let handles = vec![
            tokio::spawn(sampler.run(config.sample_interval(), rx.clone())),
            tokio::spawn(exporter.run(config.export_interval(), rx.clone())),
            tokio::spawn(run_active_window(collector, config.active_window(), rx)),
        ];

        Self { shutdown, handles }
    }

    /// Signal every loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        info!("background tasks stopped");
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Clear the active-user set every `window`.
pub async fn run_active_window(
    collector: Arc<MetricsCollector>,
    window: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!(active = collector.active_entity_count(), "clearing active users");
                collector.clear_active_entities();
            }
            _ = shutdown.changed() => break,
        }
    }
}
