//! Field metrics endpoint.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use agro_common::DateRange;
use pipeline::{FieldIndices, IndexSeries, TimelineEntry};
use providers::WeatherReport;
use storage::{is_authorized, FieldRecord};

use crate::handlers::common::{caller_id, error_response};
use crate::state::AppState;

/// Query parameters for the metrics endpoint.
#[derive(Debug, Deserialize)]
pub struct MetricsQueryParams {
    /// Range start, YYYY-MM-DD. Default: lookback window before `to`.
    pub from: Option<NaiveDate>,
    /// Range end, YYYY-MM-DD. Default: today UTC.
    pub to: Option<NaiveDate>,
}

/// Field summary embedded in the response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_reading_at: Option<DateTime<Utc>>,
}

impl From<&FieldRecord> for FieldSummary {
    fn from(field: &FieldRecord) -> Self {
        Self {
            id: field.id,
            farm_id: field.farm_id,
            name: field.name.clone(),
            latitude: field.latitude,
            longitude: field.longitude,
            last_reading_at: field.last_reading_at,
        }
    }
}

/// The dashboard payload. Always HTTP 200 once authorization has passed;
/// internal failures null the data slots instead of erroring.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub field: Option<FieldSummary>,
    pub ndvi: Option<IndexSeries>,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub chlorophyll: Option<IndexSeries>,
    pub soil_moisture: Option<IndexSeries>,
    pub evi: Option<IndexSeries>,
    pub nri: Option<IndexSeries>,
    pub dswi: Option<IndexSeries>,
    pub ndwi: Option<IndexSeries>,
    pub timeline: Vec<TimelineEntry>,
    pub weather: Option<WeatherReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricsResponse {
    /// All-null shape with an error marker; the widget renders "no data".
    pub fn degraded(field: Option<&FieldRecord>, message: &str) -> Self {
        Self {
            field: field.map(FieldSummary::from),
            ndvi: None,
            moisture: None,
            temperature: None,
            chlorophyll: None,
            soil_moisture: None,
            evi: None,
            nri: None,
            dswi: None,
            ndwi: None,
            timeline: Vec::new(),
            weather: None,
            error: Some(message.to_string()),
        }
    }
}

/// Assemble the response from pipeline output and weather.
pub fn build_metrics_response(
    field: &FieldRecord,
    indices: FieldIndices,
    weather: Option<WeatherReport>,
) -> MetricsResponse {
    // Moisture prefers the fresh soil-moisture fetch, then the field's
    // last persisted value; temperature comes from weather.
    let moisture = indices
        .soil_moisture
        .as_ref()
        .map(|s| s.latest)
        .or(field.last_moisture);
    let temperature = weather
        .as_ref()
        .map(|w| w.temperature_c)
        .or(field.last_temperature);

    MetricsResponse {
        field: Some(FieldSummary::from(field)),
        ndvi: indices.ndvi,
        moisture,
        temperature,
        chlorophyll: indices.chlorophyll,
        soil_moisture: indices.soil_moisture,
        evi: indices.evi,
        nri: indices.nri,
        dswi: indices.dswi,
        ndwi: indices.ndwi,
        timeline: indices.timeline,
        weather,
        error: if indices.degraded {
            Some("no data available".to_string())
        } else {
            None
        },
    }
}

/// GET /api/fields/:field_id/metrics
#[instrument(skip(state, headers), fields(field_id = %field_id))]
pub async fn field_metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(field_id): Path<Uuid>,
    Query(params): Query<MetricsQueryParams>,
    headers: HeaderMap,
) -> Response {
    state.metrics.metrics_requests.fetch_add(1, Ordering::Relaxed);

    let user_id = match caller_id(&headers) {
        Ok(id) => id,
        Err(response) => {
            state.metrics.auth_rejections.fetch_add(1, Ordering::Relaxed);
            return response;
        }
    };

    // Field lookup: missing field is a real 404, a broken database is not.
    let field = match state.catalog.get_field(field_id).await {
        Ok(Some(field)) => field,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("Field not found: {}", field_id),
            );
        }
        Err(e) => {
            error!(error = %e, "Field lookup failed");
            state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
            return Json(MetricsResponse::degraded(None, "field lookup failed")).into_response();
        }
    };

    // Authorization, resolved once per request.
    match state.catalog.ownership_check(&field, user_id).await {
        Ok(check) => {
            if !is_authorized(&check, user_id) {
                state.metrics.auth_rejections.fetch_add(1, Ordering::Relaxed);
                return error_response(
                    StatusCode::FORBIDDEN,
                    format!("Not authorized for field: {}", field_id),
                );
            }
        }
        Err(e) => {
            error!(error = %e, "Ownership check failed");
            state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
            return Json(MetricsResponse::degraded(Some(&field), "authorization unavailable"))
                .into_response();
        }
    }

    let Some(center) = field.centroid() else {
        warn!("Field has no centroid, returning degraded payload");
        state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
        return Json(MetricsResponse::degraded(Some(&field), "field has no coordinates"))
            .into_response();
    };

    let to = params.to.unwrap_or_else(|| Utc::now().date_naive());
    let range = match params.from {
        Some(from) => DateRange::new(from, to),
        None => DateRange::trailing_days(to, state.lookback_days),
    };

    let indices = state.index_service.fetch_field_indices(center, range).await;
    if indices.degraded {
        state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
    }

    // Weather is garnish; its failure never degrades the payload.
    let weather = match state.weather.current(center).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "Weather fetch failed");
            None
        }
    };

    Json(build_metrics_response(&field, indices, weather)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_common::Provenance;
    use pipeline::FieldIndexService;
    use test_utils::{coords, may_2024, FieldFixture};

    #[tokio::test]
    async fn test_build_response_from_stub_pipeline() {
        let field = FieldFixture::new("North plot").build();
        let service = FieldIndexService::with_providers(Vec::new());
        let indices = service
            .fetch_field_indices(coords::cairo(), may_2024())
            .await;

        let response = build_metrics_response(&field, indices, None);

        assert!(response.error.is_none());
        let ndvi = response.ndvi.expect("ndvi populated");
        assert_eq!(ndvi.provenance, Provenance::Simulated);
        assert!(response.moisture.is_some());
        assert_eq!(response.timeline.len(), 7);
        // No weather and no persisted temperature: slot stays null.
        assert!(response.temperature.is_none());
    }

    #[tokio::test]
    async fn test_weather_fills_temperature() {
        let field = FieldFixture::new("North plot").build();
        let service = FieldIndexService::with_providers(Vec::new());
        let indices = service
            .fetch_field_indices(coords::cairo(), may_2024())
            .await;

        let weather = WeatherReport {
            temperature_c: 27.5,
            humidity_percent: 40.0,
            precipitation_mm: 0.0,
            wind_speed_ms: 2.0,
            provider: "stub".into(),
            provenance: Provenance::Simulated,
        };
        let response = build_metrics_response(&field, indices, Some(weather));
        assert_eq!(response.temperature, Some(27.5));
    }

    #[test]
    fn test_degraded_shape_has_error_marker() {
        let field = FieldFixture::new("North plot").build();
        let response = MetricsResponse::degraded(Some(&field), "no data available");
        assert!(response.ndvi.is_none());
        assert!(response.timeline.is_empty());
        assert_eq!(response.error.as_deref(), Some("no data available"));
        assert!(response.field.is_some());
    }

    #[test]
    fn test_degraded_pipeline_sets_error() {
        let field = FieldFixture::new("North plot").build();
        let response = build_metrics_response(&field, FieldIndices::degraded(), None);
        assert_eq!(response.error.as_deref(), Some("no data available"));
        // Last-known denormalized values still surface when present.
        assert!(response.moisture.is_none());
    }
}
