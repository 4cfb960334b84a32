//! Host CPU / memory sampling.
//!
//! CPU is the 1-minute load average over the logical core count, memory is
//! used over total. Both are clamped to `[0, 100]` and rounded to two
//! decimals before being written into the collector. A failed read leaves
//! the previous values in place until the next tick.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::{CpuRefreshKind, System};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::metrics::{MetricsCollector, SystemSnapshot};

/// Periodically refreshes the collector's system reading.
pub struct SystemSampler {
    system: System,
    collector: Arc<MetricsCollector>,
}

impl SystemSampler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_list(CpuRefreshKind::nothing());
        Self { system, collector }
    }

    /// Read the host once. `None` when the OS gave us nothing usable.
    pub fn sample(&mut self) -> Option<SystemSnapshot> {
        self.system.refresh_memory();

        let cores = self.system.cpus().len();
        let load = System::load_average().one;
        let cpu_percent = cpu_percent(load, cores)?;
        let memory_percent =
            memory_percent(self.system.used_memory(), self.system.total_memory())?;

        Some(SystemSnapshot {
            cpu_percent,
            memory_percent,
        })
    }

    /// Sample and publish, or keep the stale reading.
    pub fn tick(&mut self) {
        match self.sample() {
            Some(reading) => {
                debug!(
                    cpu = reading.cpu_percent,
                    memory = reading.memory_percent,
                    "system sample"
                );
                self.collector.update_system(reading);
            }
            None => debug!("system sample unavailable, keeping last reading"),
        }
    }

    /// Sample every `period` until shutdown. The first sample is immediate.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = period.as_secs(), "system sampler started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                _ = shutdown.changed() => {
                    info!("system sampler shutting down");
                    break;
                }
            }
        }
    }
}

fn cpu_percent(load_one: f64, cores: usize) -> Option<f64> {
    if cores == 0 || !load_one.is_finite() || load_one < 0.0 {
        return None;
    }
    Some(to_percent(load_one / cores as f64))
}

fn memory_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(to_percent(used as f64 / total as f64))
}

/// Ratio to a `[0, 100]` percentage with two decimals.
fn to_percent(ratio: f64) -> f64 {
    let pct = (ratio * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}
