use std::collections::HashSet;

use parking_lot::Mutex;
use serde::Serialize;

use super::window::LatencyWindow;
use super::{HttpMethod, LatencyCategory};

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe metrics engine.
///
/// Request hooks call the `record_*` / `increment_*` methods, the exporter
/// calls `snapshot()` followed by `reset_interval_counters()`. One instance
/// per process, shared behind an `Arc`.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// Requests seen this interval, by method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounters {
    pub total: u64,
    pub get: u64,
    pub post: u64,
    pub put: u64,
    pub delete: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthAttempts {
    pub successful: u64,
    pub failed: u64,
}

/// Order outcomes for this interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainMetrics {
    pub completed: u64,
    pub failures: u64,
    pub revenue: f64,
}

/// Last host reading, both values in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Rounded averages plus the raw windows they were computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub all_ms: u64,
    pub domain_write_ms: u64,
    pub all_samples: Vec<u64>,
    pub domain_write_samples: Vec<u64>,
}

/// Point-in-time copy of the collector. Owns all of its data.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: RequestCounters,
    pub active_users: usize,
    /// Caller ids, sorted. Not serialized.
    #[serde(skip)]
    pub active_entities: Vec<String>,
    pub auth: AuthAttempts,
    pub domain: DomainMetrics,
    pub latency: LatencySummary,
    pub system: SystemSnapshot,
}

/// Counters and averages only, for high-frequency local polling.
/// Skips the id set and the raw latency windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveView {
    pub requests: RequestCounters,
    pub active_users: usize,
    pub auth: AuthAttempts,
    pub domain: DomainMetrics,
    pub latency_all_ms: u64,
    pub latency_domain_write_ms: u64,
    pub system: SystemSnapshot,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    // Interval counters, zeroed on every export
    requests: RequestCounters,
    auth: AuthAttempts,
    domain: DomainMetrics,
    latency_all: LatencyWindow,
    latency_domain_write: LatencyWindow,

    // Rolling presence window, cleared on its own cadence
    active_entities: HashSet<String>,

    // Written by the sampler only
    system: SystemSnapshot,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Count one request. Unrecognised methods only bump the total.
    pub fn increment_request(&self, method: &str) {
        let method = HttpMethod::parse(method);
        let mut inner = self.inner.lock();
        let counters = &mut inner.requests;
        counters.total += 1;
        match method {
            Some(HttpMethod::Get) => counters.get += 1,
            Some(HttpMethod::Post) => counters.post += 1,
            Some(HttpMethod::Put) => counters.put += 1,
            Some(HttpMethod::Delete) => counters.delete += 1,
            None => {}
        }
    }

    /// Remember a caller id. Empty ids are ignored.
    pub fn track_active_entity(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        if !inner.active_entities.contains(id) {
            inner.active_entities.insert(id.to_owned());
        }
    }

    pub fn active_entity_count(&self) -> usize {
        self.inner.lock().active_entities.len()
    }

    pub fn clear_active_entities(&self) {
        self.inner.lock().active_entities.clear();
    }

    pub fn record_auth_success(&self) {
        self.inner.lock().auth.successful += 1;
    }

    pub fn record_auth_failure(&self) {
        self.inner.lock().auth.failed += 1;
    }

    /// A completed order worth `amount`.
    pub fn record_domain_event(&self, amount: f64) {
        let mut inner = self.inner.lock();
        inner.domain.completed += 1;
        inner.domain.revenue += amount;
    }

    pub fn record_domain_failure(&self) {
        self.inner.lock().domain.failures += 1;
    }

    /// Every sample lands in the `All` window; domain writes also land in
    /// their own.
    pub fn record_latency(&self, category: LatencyCategory, millis: u64) {
        let mut inner = self.inner.lock();
        inner.latency_all.push(millis);
        if category == LatencyCategory::DomainWrite {
            inner.latency_domain_write.push(millis);
        }
    }

    pub fn average_latency(&self, category: LatencyCategory) -> u64 {
        let inner = self.inner.lock();
        match category {
            LatencyCategory::All => inner.latency_all.average(),
            LatencyCategory::DomainWrite => inner.latency_domain_write.average(),
        }
    }

    /// Store the sampler's latest reading.
    pub fn update_system(&self, reading: SystemSnapshot) {
        self.inner.lock().system = reading;
    }

    /// Produce a read-only copy. Never mutates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn live_view(&self) -> LiveView {
        let inner = self.inner.lock();
        LiveView {
            requests: inner.requests.clone(),
            active_users: inner.active_entities.len(),
            auth: inner.auth.clone(),
            domain: inner.domain.clone(),
            latency_all_ms: inner.latency_all.average(),
            latency_domain_write_ms: inner.latency_domain_write.average(),
            system: inner.system,
        }
    }

    /// Zero the per-interval counters and empty both latency windows.
    /// Active entities and the system reading survive.
    pub fn reset_interval_counters(&self) {
        let mut inner = self.inner.lock();
        inner.requests = RequestCounters::default();
        inner.auth = AuthAttempts::default();
        inner.domain = DomainMetrics::default();
        inner.latency_all.clear();
        inner.latency_domain_write.clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn snapshot(&self) -> MetricsSnapshot {
        let mut active_entities: Vec<String> = self.active_entities.iter().cloned().collect();
        active_entities.sort();

        MetricsSnapshot {
            requests: self.requests.clone(),
            active_users: active_entities.len(),
            active_entities,
            auth: self.auth.clone(),
            domain: self.domain.clone(),
            latency: LatencySummary {
                all_ms: self.latency_all.average(),
                domain_write_ms: self.latency_domain_write.average(),
                all_samples: self.latency_all.to_vec(),
                domain_write_samples: self.latency_domain_write.to_vec(),
            },
            system: self.system,
        }
    }
}
