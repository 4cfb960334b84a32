use std::fmt;
use std::time::Duration;

use clap::Args;

use crate::error::{ExportError, ExportResult};

// ─── Defaults ────────────────────────────────────────────────────

const DEFAULT_EXPORT_INTERVAL_SECS: u64 = 10;
const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 10;
const DEFAULT_ACTIVE_WINDOW_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Upper bound for any configured period; keeps `Instant + period` in range.
const MAX_PERIOD_SECS: u64 = 86_400;

/// Settings for the telemetry pipeline.
///
/// Every field can come from a flag or the environment. The three export
/// targets are optional on purpose: the exporter re-checks them for every
/// metric and skips delivery while any of them is missing.
#[derive(Clone, Args)]
pub struct TelemetryConfig {
    /// Metrics ingestion endpoint URL.
    #[arg(long = "metrics-url", env = "METRICS_URL")]
    pub endpoint: Option<String>,

    /// Bearer credential for the ingestion endpoint.
    #[arg(long = "metrics-api-key", env = "METRICS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Value of the `service.name` resource attribute.
    #[arg(long = "metrics-source", env = "METRICS_SOURCE")]
    pub service_name: Option<String>,

    /// Seconds between export ticks.
    #[arg(long, env = "METRICS_EXPORT_INTERVAL", default_value_t = DEFAULT_EXPORT_INTERVAL_SECS)]
    pub export_interval_secs: u64,

    /// Seconds between CPU / memory samples.
    #[arg(long, env = "METRICS_SAMPLE_INTERVAL", default_value_t = DEFAULT_SAMPLE_INTERVAL_SECS)]
    pub sample_interval_secs: u64,

    /// Seconds an active user stays counted before the set is cleared.
    #[arg(long, env = "METRICS_ACTIVE_WINDOW", default_value_t = DEFAULT_ACTIVE_WINDOW_SECS)]
    pub active_window_secs: u64,

    /// Timeout for a single outbound push.
    #[arg(long, env = "METRICS_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
}

/// The fully-resolved export target for one delivery.
#[derive(Clone)]
pub struct Credentials {
    pub endpoint: String,
    pub api_key: String,
    pub service_name: String,
}

impl TelemetryConfig {
    /// Resolve the export target, or name the first missing setting.
    pub fn credentials(&self) -> ExportResult<Credentials> {
        let endpoint = present(&self.endpoint).ok_or(ExportError::MissingConfig("endpoint"))?;
        let api_key = present(&self.api_key).ok_or(ExportError::MissingConfig("api key"))?;
        let service_name =
            present(&self.service_name).ok_or(ExportError::MissingConfig("service name"))?;

        Ok(Credentials {
            endpoint: endpoint.to_owned(),
            api_key: api_key.to_owned(),
            service_name: service_name.to_owned(),
        })
    }

    pub fn export_interval(&self) -> Duration {
        seconds(self.export_interval_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        seconds(self.sample_interval_secs)
    }

    pub fn active_window(&self) -> Duration {
        seconds(self.active_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout_secs)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            service_name: None,
            export_interval_secs: DEFAULT_EXPORT_INTERVAL_SECS,
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            active_window_secs: DEFAULT_ACTIVE_WINDOW_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// The api key never goes to logs.
impl fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key_set", &present(&self.api_key).is_some())
            .field("service_name", &self.service_name)
            .field("export_interval_secs", &self.export_interval_secs)
            .field("sample_interval_secs", &self.sample_interval_secs)
            .field("active_window_secs", &self.active_window_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Empty strings count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Zero would make `tokio::time::interval` panic and huge values overflow
/// `Instant`; clamp to `[1s, 1 day]`.
fn seconds(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(1, MAX_PERIOD_SECS))
}
