//! Dynamic soil analysis endpoint.
//!
//! Thresholds index values into advisory recommendations and a composite
//! health score. The output inherits the provenance of its inputs; with
//! no configured providers it is simulated advisory content, not an
//! agronomic assessment.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};
use uuid::Uuid;

use agro_common::{Coordinates, DateRange, Provenance};
use pipeline::FieldIndices;
use storage::is_authorized;

use crate::handlers::common::{caller_id, error_response};
use crate::state::AppState;

/// Request body: a field reference or raw coordinates.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilAnalysisRequest {
    pub field_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilMetrics {
    pub ndvi: f64,
    pub evi: f64,
    pub ndwi: f64,
    pub chlorophyll: Option<f64>,
    pub soil_moisture: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SatelliteData {
    pub provider: String,
    pub provenance: Provenance,
    pub captured_on: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilAnalysis {
    pub metrics: SoilMetrics,
    pub satellite_data: SatelliteData,
    pub recommendations: Vec<String>,
    pub health_score: u8,
    pub trend_analysis: String,
}

#[derive(Debug, Serialize)]
pub struct SoilAnalysisResponse {
    pub analysis: Option<SoilAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Derive the advisory analysis from aggregated indices.
pub fn build_soil_analysis(indices: &FieldIndices) -> Option<SoilAnalysis> {
    let ndvi = indices.ndvi.as_ref()?;
    let evi = indices.evi.as_ref()?;
    let ndwi = indices.ndwi.as_ref()?;
    let chlorophyll = indices.chlorophyll.as_ref().map(|s| s.latest);
    let soil_moisture = indices.soil_moisture.as_ref().map(|s| s.latest);

    let mut recommendations = Vec::new();
    if ndvi.latest < 0.3 {
        recommendations.push(
            "Vegetation vigor is low; inspect for nutrient deficiency or pest pressure."
                .to_string(),
        );
    }
    if let Some(moisture) = soil_moisture {
        if moisture < 0.15 {
            recommendations
                .push("Soil moisture is low; consider increasing irrigation.".to_string());
        } else if moisture > 0.40 {
            recommendations
                .push("Soil moisture is high; check drainage before irrigating again.".to_string());
        }
    }
    if ndwi.latest < 0.0 {
        recommendations.push("Water index indicates canopy water stress.".to_string());
    }
    if recommendations.is_empty() {
        recommendations
            .push("Indices are within normal ranges; maintain the current regimen.".to_string());
    }

    Some(SoilAnalysis {
        health_score: health_score(ndvi.latest, soil_moisture, chlorophyll),
        trend_analysis: trend_from_history(&ndvi.history),
        metrics: SoilMetrics {
            ndvi: ndvi.latest,
            evi: evi.latest,
            ndwi: ndwi.latest,
            chlorophyll,
            soil_moisture,
        },
        satellite_data: SatelliteData {
            provider: ndvi.provider.clone(),
            provenance: ndvi.provenance,
            captured_on: ndvi.captured_on,
        },
        recommendations,
    })
}

/// Composite 0-100 score: NDVI carries half the weight, moisture and
/// chlorophyll a quarter each (renormalized when absent).
fn health_score(ndvi: f64, soil_moisture: Option<f64>, chlorophyll: Option<f64>) -> u8 {
    let ndvi_score = ((ndvi + 1.0) / 2.0).clamp(0.0, 1.0);

    let mut weighted = ndvi_score * 0.5;
    let mut total_weight = 0.5;

    if let Some(moisture) = soil_moisture {
        // 0.25 is the sweet spot; distance from it costs score.
        let moisture_score = (1.0 - (moisture - 0.25).abs() * 4.0).clamp(0.0, 1.0);
        weighted += moisture_score * 0.25;
        total_weight += 0.25;
    }
    if let Some(chl) = chlorophyll {
        let chl_score = (chl / 50.0).clamp(0.0, 1.0);
        weighted += chl_score * 0.25;
        total_weight += 0.25;
    }

    ((weighted / total_weight) * 100.0).round() as u8
}

fn trend_from_history(history: &[pipeline::HistoryPoint]) -> String {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return "unknown".to_string();
    };
    let diff = last.value - first.value;
    if diff > 0.01 {
        "improving".to_string()
    } else if diff < -0.01 {
        "declining".to_string()
    } else {
        "stable".to_string()
    }
}

/// POST /api/soil-analysis/dynamic
#[instrument(skip(state, headers, body))]
pub async fn soil_analysis_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SoilAnalysisRequest>,
) -> Response {
    state.metrics.soil_requests.fetch_add(1, Ordering::Relaxed);

    let user_id = match caller_id(&headers) {
        Ok(id) => id,
        Err(response) => {
            state.metrics.auth_rejections.fetch_add(1, Ordering::Relaxed);
            return response;
        }
    };

    // Resolve the analysis point: a field the caller owns, or raw coords.
    let center = if let Some(field_id) = body.field_id {
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
                return Json(SoilAnalysisResponse {
                    analysis: None,
                    error: Some("field lookup failed".to_string()),
                })
                .into_response();
            }
        };

        match state.catalog.ownership_check(&field, user_id).await {
            Ok(check) if is_authorized(&check, user_id) => {}
            Ok(_) => {
                state.metrics.auth_rejections.fetch_add(1, Ordering::Relaxed);
                return error_response(
                    StatusCode::FORBIDDEN,
                    format!("Not authorized for field: {}", field_id),
                );
            }
            Err(e) => {
                error!(error = %e, "Ownership check failed");
                state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
                return Json(SoilAnalysisResponse {
                    analysis: None,
                    error: Some("authorization unavailable".to_string()),
                })
                .into_response();
            }
        }

        match field.centroid() {
            Some(center) => center,
            None => {
                state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
                return Json(SoilAnalysisResponse {
                    analysis: None,
                    error: Some("field has no coordinates".to_string()),
                })
                .into_response();
            }
        }
    } else {
        match (body.latitude, body.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Request requires fieldId or latitude/longitude",
                );
            }
        }
    };

    let range = DateRange::trailing_days(Utc::now().date_naive(), state.lookback_days);
    let indices = state.index_service.fetch_field_indices(center, range).await;

    match build_soil_analysis(&indices) {
        Some(analysis) => Json(SoilAnalysisResponse {
            analysis: Some(analysis),
            error: None,
        })
        .into_response(),
        None => {
            state.metrics.degraded_responses.fetch_add(1, Ordering::Relaxed);
            Json(SoilAnalysisResponse {
                analysis: None,
                error: Some("no data available".to_string()),
            })
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::FieldIndexService;
    use test_utils::{coords, may_2024};

    #[tokio::test]
    async fn test_analysis_from_stub_pipeline() {
        let service = FieldIndexService::with_providers(Vec::new());
        let indices = service
            .fetch_field_indices(coords::cairo(), may_2024())
            .await;

        let analysis = build_soil_analysis(&indices).expect("analysis present");
        assert!(analysis.health_score <= 100);
        assert!(!analysis.recommendations.is_empty());
        assert_eq!(analysis.satellite_data.provider, "stub");
        assert_eq!(analysis.satellite_data.provenance, Provenance::Simulated);
        assert!(["improving", "declining", "stable"]
            .contains(&analysis.trend_analysis.as_str()));
    }

    #[test]
    fn test_degraded_indices_yield_no_analysis() {
        assert!(build_soil_analysis(&FieldIndices::degraded()).is_none());
    }

    #[test]
    fn test_health_score_bounds() {
        assert_eq!(health_score(1.0, Some(0.25), Some(50.0)), 100);
        assert_eq!(health_score(-1.0, Some(1.0), Some(0.0)), 0);
        // NDVI-only path renormalizes to the full scale.
        assert_eq!(health_score(1.0, None, None), 100);
    }

    #[test]
    fn test_trend_classification() {
        use pipeline::HistoryPoint;
        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let series = |a: f64, b: f64| {
            vec![
                HistoryPoint {
                    date: day,
                    value: a,
                },
                HistoryPoint {
                    date: day,
                    value: b,
                },
            ]
        };
        assert_eq!(trend_from_history(&series(0.4, 0.5)), "improving");
        assert_eq!(trend_from_history(&series(0.5, 0.4)), "declining");
        assert_eq!(trend_from_history(&series(0.5, 0.505)), "stable");
        assert_eq!(trend_from_history(&[]), "unknown");
    }
}
