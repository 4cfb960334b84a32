//! Wire format for the metrics backend: one gauge per request body.

use serde::Serialize;

use super::GaugeReading;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPayload {
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    pub string_value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeMetrics {
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub gauge: Gauge,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub as_double: f64,
    /// Epoch nanoseconds, encoded as a string.
    pub time_unix_nano: String,
    pub attributes: Vec<KeyValue>,
}

impl MetricPayload {
    /// Wrap a single reading, stamped with `time_unix_nano`.
    pub fn gauge(service_name: &str, reading: &GaugeReading, time_unix_nano: i64) -> Self {
        let value = if reading.value.is_finite() {
            reading.value
        } else {
            0.0
        };

        Self {
            resource_metrics: vec![ResourceMetrics {
                resource: Resource {
                    attributes: vec![KeyValue {
                        key: "service.name".to_owned(),
                        value: AnyValue {
                            string_value: service_name.to_owned(),
                        },
                    }],
                },
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![Metric {
                        name: reading.name.to_owned(),
                        description: format!("{} metric", reading.name),
                        unit: reading.unit.to_owned(),
                        gauge: Gauge {
                            data_points: vec![DataPoint {
                                as_double: value,
                                time_unix_nano: time_unix_nano.to_string(),
                                attributes: Vec::new(),
                            }],
                        },
                    }],
                }],
            }],
        }
    }

    /// Name of the (single) metric carried by this payload.
    pub fn metric_name(&self) -> Option<&str> {
        self.resource_metrics
            .first()?
            .scope_metrics
            .first()?
            .metrics
            .first()
            .map(|m| m.name.as_str())
    }
}

/// Current wall-clock time in epoch nanoseconds.
pub fn now_unix_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn matches_backend_shape() {
        let reading = GaugeReading {
            name: "pizza_revenue",
            unit: "dollars",
            value: 0.0084,
        };
        let payload = MetricPayload::gauge("jwt-pizza-service", &reading, 1_700_000_000_000_000_000);

        let expected = json!({
            "resourceMetrics": [{
                "resource": {
                    "attributes": [{
                        "key": "service.name",
                        "value": { "stringValue": "jwt-pizza-service" }
                    }]
                },
                "scopeMetrics": [{
                    "metrics": [{
                        "name": "pizza_revenue",
                        "description": "pizza_revenue metric",
                        "unit": "dollars",
                        "gauge": {
                            "dataPoints": [{
                                "asDouble": 0.0084,
                                "timeUnixNano": "1700000000000000000",
                                "attributes": []
                            }]
                        }
                    }]
                }]
            }]
        });

        assert_eq!(serde_json::to_value(&payload).unwrap(), expected);
        assert_eq!(payload.metric_name(), Some("pizza_revenue"));
    }

    #[test]
    fn non_finite_values_export_as_zero() {
        let reading = GaugeReading {
            name: "system_cpu_usage",
            unit: "percent",
            value: f64::NAN,
        };
        let payload = MetricPayload::gauge("svc", &reading, 1);
        let point = &payload.resource_metrics[0].scope_metrics[0].metrics[0]
            .gauge
            .data_points[0];
        assert_eq!(point.as_double, 0.0);
    }

    #[test]
    fn timestamp_is_nanoseconds() {
        // Anything after 2020 in ns has 19 digits.
        assert_eq!(now_unix_nanos().to_string().len(), 19);
    }
}
