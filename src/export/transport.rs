use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use super::payload::MetricPayload;
use crate::config::Credentials;
use crate::error::{ExportError, ExportResult};

/// Delivers one metric payload to the backend.
///
/// Implementations must be cheap to share: the exporter holds one behind
/// an `Arc` and calls it from a separate task per metric.
pub trait Transport: Send + Sync + 'static {
    fn push(
        &self,
        credentials: &Credentials,
        payload: &MetricPayload,
    ) -> impl Future<Output = ExportResult<()>> + Send;
}

/// JSON-over-HTTP delivery with bearer auth.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Every push is bounded by `timeout` so stalled connections can't pile up.
    pub fn new(timeout: Duration) -> ExportResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn push(&self, credentials: &Credentials, payload: &MetricPayload) -> ExportResult<()> {
        let body = serde_json::to_vec(payload)?;

        let response = self
            .client
            .post(&credentials.endpoint)
            .bearer_auth(&credentials.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
