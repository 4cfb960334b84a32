//! Periodic push of collector snapshots to the metrics backend.
//!
//! Each tick takes a snapshot, fans it out into one gauge per metric, and
//! spawns an independent delivery task for each. The tick never waits on
//! those tasks: counters are reset as soon as every delivery has been
//! *attempted*, whatever the outcome. A slow backend can therefore make two
//! ticks overlap, which only ever duplicates readings downstream.

pub mod payload;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::TelemetryConfig;
use crate::metrics::{MetricsCollector, MetricsSnapshot};

pub use payload::MetricPayload;
pub use transport::{HttpTransport, Transport};

/// One named value ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReading {
    pub name: &'static str,
    pub unit: &'static str,
    pub value: f64,
}

impl GaugeReading {
    fn new(name: &'static str, unit: &'static str, value: f64) -> Self {
        Self { name, unit, value }
    }
}

/// The fixed list of exported metrics, in export order.
pub fn gauges(snapshot: &MetricsSnapshot) -> Vec<GaugeReading> {
    let r = &snapshot.requests;
    let d = &snapshot.domain;

    vec![
        // Requests per method
        GaugeReading::new("http_requests_total", "requests", r.total as f64),
        GaugeReading::new("http_requests_get", "requests", r.get as f64),
        GaugeReading::new("http_requests_post", "requests", r.post as f64),
        GaugeReading::new("http_requests_put", "requests", r.put as f64),
        GaugeReading::new("http_requests_delete", "requests", r.delete as f64),
        // Presence
        GaugeReading::new("active_users", "users", snapshot.active_users as f64),
        // Auth
        GaugeReading::new("auth_attempts_successful", "attempts", snapshot.auth.successful as f64),
        GaugeReading::new("auth_attempts_failed", "attempts", snapshot.auth.failed as f64),
        // Host
        GaugeReading::new("system_cpu_usage", "percent", snapshot.system.cpu_percent),
        GaugeReading::new("system_memory_usage", "percent", snapshot.system.memory_percent),
        // Orders
        GaugeReading::new("pizza_sold", "pizzas", d.completed as f64),
        GaugeReading::new("pizza_creation_failures", "failures", d.failures as f64),
        GaugeReading::new("pizza_revenue", "dollars", d.revenue),
        // Latency
        GaugeReading::new("latency_all_endpoints", "ms", snapshot.latency.all_ms as f64),
        GaugeReading::new("latency_pizza_creation", "ms", snapshot.latency.domain_write_ms as f64),
    ]
}

/// Pushes collector snapshots through a [`Transport`].
pub struct Exporter<T> {
    collector: Arc<MetricsCollector>,
    config: Arc<TelemetryConfig>,
    transport: Arc<T>,
}

impl<T: Transport> Exporter<T> {
    pub fn new(
        collector: Arc<MetricsCollector>,
        config: Arc<TelemetryConfig>,
        transport: Arc<T>,
    ) -> Self {
        Self {
            collector,
            config,
            transport,
        }
    }

    /// Run one export cycle.
    ///
    /// Returns the spawned delivery tasks so callers *may* wait on them;
    /// the scheduler loop just drops the handles.
    pub fn tick(&self) -> Vec<JoinHandle<()>> {
        let snapshot = self.collector.snapshot();
        let time_unix_nano = payload::now_unix_nanos();
        let readings = gauges(&snapshot);

        let mut deliveries = Vec::with_capacity(readings.len());
        for reading in &readings {
            // Re-checked per metric so a half-configured process just skips.
            let credentials = match self.config.credentials() {
                Ok(credentials) => credentials,
                Err(e) => {
                    warn!(metric = reading.name, "skipping export: {e}");
                    continue;
                }
            };

            let payload = MetricPayload::gauge(&credentials.service_name, reading, time_unix_nano);
            let transport = Arc::clone(&self.transport);
            let name = reading.name;
            let unit = reading.unit;
            let value = reading.value;

            deliveries.push(tokio::spawn(async move {
                match transport.push(&credentials, &payload).await {
                    Ok(()) => debug!(metric = name, value, unit, "pushed metric"),
                    Err(e) => error!(metric = name, error = %e, "failed to push metric"),
                }
            }));
        }

        self.collector.reset_interval_counters();
        deliveries
    }

    /// Tick every `period` until shutdown. The first export happens one
    /// period after start.
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = period.as_secs(), "metrics exporter started");

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let deliveries = self.tick();
                    debug!(attempted = deliveries.len(), "export tick");
                }
                _ = shutdown.changed() => {
                    info!("metrics exporter shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::Credentials;
    use crate::error::{ExportError, ExportResult};
    use crate::metrics::LatencyCategory;

    /// Records every push; optionally fails or hangs on one metric.
    #[derive(Default)]
    struct RecordingTransport {
        pushed: Mutex<Vec<(String, String)>>,
        fail_on: Option<&'static str>,
        hang: bool,
    }

    impl RecordingTransport {
        fn names(&self) -> Vec<String> {
            self.pushed.lock().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    impl Transport for RecordingTransport {
        fn push(
            &self,
            credentials: &Credentials,
            payload: &MetricPayload,
        ) -> impl Future<Output = ExportResult<()>> + Send {
            let name = payload.metric_name().unwrap_or_default().to_owned();
            self.pushed
                .lock()
                .push((name.clone(), credentials.endpoint.clone()));
            let fail = self.fail_on == Some(name.as_str());
            let hang = self.hang;

            async move {
                if hang {
                    std::future::pending::<()>().await;
                }
                if fail {
                    return Err(ExportError::Rejected {
                        status: 500,
                        body: "ingest unavailable".into(),
                    });
                }
                Ok(())
            }
        }
    }

    fn configured() -> Arc<TelemetryConfig> {
        Arc::new(TelemetryConfig {
            endpoint: Some("https://otlp.example.com/v1/metrics".into()),
            api_key: Some("key".into()),
            service_name: Some("jwt-pizza-service".into()),
            ..TelemetryConfig::default()
        })
    }

    fn busy_collector() -> Arc<MetricsCollector> {
        let collector = Arc::new(MetricsCollector::new());
        collector.increment_request("POST");
        collector.increment_request("GET");
        collector.track_active_entity("7");
        collector.record_domain_event(0.05);
        collector.record_latency(LatencyCategory::DomainWrite, 40);
        collector
    }

    async fn join_all(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn gauges_cover_every_metric_once() {
        let collector = busy_collector();
        let readings = gauges(&collector.snapshot());

        assert_eq!(readings.len(), 15);
        let mut names: Vec<_> = readings.iter().map(|g| g.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 15);

        let find = |n: &str| readings.iter().find(|g| g.name == n).unwrap().value;
        assert_eq!(find("http_requests_total"), 2.0);
        assert_eq!(find("http_requests_post"), 1.0);
        assert_eq!(find("active_users"), 1.0);
        assert_eq!(find("pizza_sold"), 1.0);
        assert_eq!(find("pizza_revenue"), 0.05);
        assert_eq!(find("latency_pizza_creation"), 40.0);
    }

    #[tokio::test]
    async fn configured_tick_pushes_every_metric() {
        let collector = busy_collector();
        let transport = Arc::new(RecordingTransport::default());
        let exporter = Exporter::new(Arc::clone(&collector), configured(), Arc::clone(&transport));

        let deliveries = exporter.tick();
        assert_eq!(deliveries.len(), 15);
        join_all(deliveries).await;

        let pushed = transport.pushed.lock().clone();
        assert_eq!(pushed.len(), 15);
        assert!(pushed
            .iter()
            .all(|(_, endpoint)| endpoint == "https://otlp.example.com/v1/metrics"));
    }

    #[tokio::test]
    async fn one_failed_push_does_not_stop_the_rest() {
        let collector = busy_collector();
        let transport = Arc::new(RecordingTransport {
            fail_on: Some("http_requests_get"),
            ..RecordingTransport::default()
        });
        let exporter = Exporter::new(Arc::clone(&collector), configured(), Arc::clone(&transport));

        join_all(exporter.tick()).await;

        let names = transport.names();
        assert_eq!(names.len(), 15);
        assert!(names.contains(&"http_requests_get".to_owned()));
        assert!(names.contains(&"latency_pizza_creation".to_owned()));
    }

    #[tokio::test]
    async fn missing_credential_skips_every_push() {
        let collector = busy_collector();
        let transport = Arc::new(RecordingTransport::default());
        let config = Arc::new(TelemetryConfig {
            api_key: None,
            ..(*configured()).clone()
        });
        let exporter = Exporter::new(Arc::clone(&collector), config, Arc::clone(&transport));

        let deliveries = exporter.tick();
        assert!(deliveries.is_empty());
        assert!(transport.names().is_empty());

        // Counters still roll over.
        assert_eq!(collector.snapshot().requests.total, 0);
    }

    #[tokio::test]
    async fn tick_resets_interval_counters_but_not_active_users() {
        let collector = busy_collector();
        let transport = Arc::new(RecordingTransport::default());
        let exporter = Exporter::new(Arc::clone(&collector), configured(), transport);

        join_all(exporter.tick()).await;

        let snap = collector.snapshot();
        assert_eq!(snap.requests.total, 0);
        assert_eq!(snap.domain.completed, 0);
        assert!(snap.latency.all_samples.is_empty());
        assert_eq!(snap.active_users, 1);
    }

    #[tokio::test]
    async fn tick_does_not_wait_for_a_hanging_backend() {
        let collector = busy_collector();
        let transport = Arc::new(RecordingTransport {
            hang: true,
            ..RecordingTransport::default()
        });
        let exporter = Exporter::new(Arc::clone(&collector), configured(), Arc::clone(&transport));

        let deliveries = exporter.tick();
        assert_eq!(deliveries.len(), 15);
        assert_eq!(collector.snapshot().requests.total, 0);

        // Let every delivery task start and block on the backend.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.names().len(), 15);
        assert!(deliveries.iter().all(|d| !d.is_finished()));

        // A second tick overlaps the first without trouble.
        collector.increment_request("PUT");
        let second = exporter.tick();
        assert_eq!(second.len(), 15);

        for handle in deliveries.into_iter().chain(second) {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_exports_once_per_period_until_shutdown() {
        let collector = busy_collector();
        let transport = Arc::new(RecordingTransport::default());
        let exporter = Exporter::new(Arc::clone(&collector), configured(), Arc::clone(&transport));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(exporter.run(Duration::from_secs(10), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(transport.names().len(), 30);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
