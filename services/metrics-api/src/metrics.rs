//! Request counters exposed on /metrics.

use std::sync::atomic::AtomicU64;

/// Process-wide counters, incremented by handlers.
#[derive(Debug, Default)]
pub struct ApiMetrics {
    /// Field metrics requests served.
    pub metrics_requests: AtomicU64,
    /// Soil analysis requests served.
    pub soil_requests: AtomicU64,
    /// Responses that fell back to the degraded all-null shape.
    pub degraded_responses: AtomicU64,
    /// Requests rejected with 401/403.
    pub auth_rejections: AtomicU64,
}
