pub mod collector;
pub mod stream;
pub mod window;

pub use collector::{
    AuthAttempts, DomainMetrics, LatencySummary, LiveView, MetricsCollector, MetricsSnapshot,
    RequestCounters, SystemSnapshot,
};
pub use window::LatencyWindow;

/// The HTTP methods that get their own request counter.
/// Anything else is still counted in the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Exact, upper-case match. `"get"` or `"PATCH"` yield `None`.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Which latency window(s) a request's elapsed time lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyCategory {
    /// Every request.
    All,
    /// Order creation (`POST /api/order`). Also counted in `All`.
    DomainWrite,
}

impl LatencyCategory {
    /// Path prefix of the high-value write operation.
    pub const DOMAIN_WRITE_PATH: &'static str = "/api/order";

    pub fn classify(method: &str, path: &str) -> Self {
        if method == "POST" && path.contains(Self::DOMAIN_WRITE_PATH) {
            Self::DomainWrite
        } else {
            Self::All
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_exact() {
        assert_eq!(HttpMethod::parse("DELETE"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("get"), None);
        assert_eq!(HttpMethod::parse("PATCH"), None);
    }

    #[test]
    fn only_order_posts_are_domain_writes() {
        assert_eq!(
            LatencyCategory::classify("POST", "/api/order"),
            LatencyCategory::DomainWrite
        );
        assert_eq!(
            LatencyCategory::classify("GET", "/api/order"),
            LatencyCategory::All
        );
        assert_eq!(
            LatencyCategory::classify("POST", "/api/auth"),
            LatencyCategory::All
        );
    }
}
