//! Health checks and Prometheus metrics endpoints.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// GET /health - Basic health check
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /ready - Readiness check (verifies database connectivity)
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.catalog.ping().await {
        Ok(_) => (StatusCode::OK, "Ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let mut output = String::new();

    output.push_str(&format!(
        "# HELP field_metrics_requests_total Total field metrics requests\n# TYPE field_metrics_requests_total counter\nfield_metrics_requests_total {}\n",
        state.metrics.metrics_requests.load(Ordering::Relaxed)
    ));
    output.push_str(&format!(
        "# HELP soil_analysis_requests_total Total soil analysis requests\n# TYPE soil_analysis_requests_total counter\nsoil_analysis_requests_total {}\n",
        state.metrics.soil_requests.load(Ordering::Relaxed)
    ));
    output.push_str(&format!(
        "# HELP degraded_responses_total Responses degraded to the all-null shape\n# TYPE degraded_responses_total counter\ndegraded_responses_total {}\n",
        state.metrics.degraded_responses.load(Ordering::Relaxed)
    ));
    output.push_str(&format!(
        "# HELP auth_rejections_total Requests rejected with 401/403\n# TYPE auth_rejections_total counter\nauth_rejections_total {}\n",
        state.metrics.auth_rejections.load(Ordering::Relaxed)
    ));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        output,
    )
        .into_response()
}
