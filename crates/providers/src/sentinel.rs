//! Sentinel Hub statistics client with OAuth client-credentials auth.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use agro_common::{
    index::{clamp_ratio, evi_from_ndvi, ndvi_from_image_bytes},
    AgroError, AgroResult, BoundingBox, Coordinates, DateRange, IndexKind, Observation, Provenance,
};

use crate::token::TokenCache;
use crate::IndexProvider;
use async_trait::async_trait;

const PROVIDER_NAME: &str = "sentinel-hub";

/// Half-size of the bbox requested around a field centroid, degrees.
const FIELD_BBOX_HALF_DEG: f64 = 0.001;

/// Sentinel Hub statistics/process API client.
pub struct SentinelHubProvider {
    client: Client,
    base_url: String,
    tokens: TokenCache,
}

#[derive(Debug, Deserialize)]
struct StatisticalResponse {
    #[serde(default)]
    data: Vec<IntervalData>,
}

#[derive(Debug, Deserialize)]
struct IntervalData {
    interval: Interval,
    outputs: Outputs,
}

#[derive(Debug, Deserialize)]
struct Interval {
    from: String,
}

#[derive(Debug, Deserialize)]
struct Outputs {
    default: OutputBands,
}

#[derive(Debug, Deserialize)]
struct OutputBands {
    bands: Bands,
}

#[derive(Debug, Deserialize)]
struct Bands {
    #[serde(rename = "B0")]
    b0: BandStats,
}

#[derive(Debug, Deserialize)]
struct BandStats {
    stats: Stats,
}

#[derive(Debug, Deserialize)]
struct Stats {
    mean: f64,
}

impl SentinelHubProvider {
    pub fn new(client_id: String, client_secret: String, base_url: String) -> AgroResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AgroError::InternalError(format!("HTTP client build failed: {}", e)))?;

        let token_url = format!("{}/oauth/token", base_url);
        let tokens = TokenCache::new(client.clone(), token_url, client_id, client_secret);

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    fn evalscript(kind: IndexKind) -> Option<&'static str> {
        match kind {
            IndexKind::Ndvi => Some(NDVI_EVALSCRIPT),
            IndexKind::Ndwi => Some(NDWI_EVALSCRIPT),
            _ => None,
        }
    }

    /// Run a statistics request and return (mean, capture date) of the most
    /// recent interval with data.
    async fn fetch_statistics(
        &self,
        evalscript: &str,
        center: Coordinates,
        range: DateRange,
    ) -> AgroResult<(f64, NaiveDate)> {
        let token = self.tokens.bearer_token(PROVIDER_NAME).await?;
        let bbox = BoundingBox::around(center, FIELD_BBOX_HALF_DEG);

        let body = json!({
            "input": {
                "bounds": {
                    "bbox": [bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat],
                    "properties": { "crs": "http://www.opengis.net/def/crs/EPSG/0/4326" }
                },
                "data": [{ "type": "sentinel-2-l2a" }]
            },
            "aggregation": {
                "timeRange": {
                    "from": range.start_datetime().to_rfc3339(),
                    "to": range.end_datetime().to_rfc3339()
                },
                "aggregationInterval": { "of": "P1D" },
                "evalscript": evalscript
            }
        });

        let url = format!("{}/api/v1/statistics", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("statistics request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("statistics HTTP {}", response.status()),
            });
        }

        let stats: StatisticalResponse =
            response.json().await.map_err(|e| AgroError::ProviderPayload {
                provider: PROVIDER_NAME.to_string(),
                message: format!("statistics decode failed: {}", e),
            })?;

        let interval = stats
            .data
            .into_iter()
            .max_by(|a, b| a.interval.from.cmp(&b.interval.from))
            .ok_or_else(|| AgroError::ProviderPayload {
                provider: PROVIDER_NAME.to_string(),
                message: "no intervals with data in range".to_string(),
            })?;

        let captured_on = parse_interval_date(&interval.interval.from)?;
        Ok((interval.outputs.default.bands.b0.stats.mean, captured_on))
    }

    /// Low-fidelity path: request a rendered tile and reduce its bytes to
    /// an NDVI-like scalar. Used when the statistics API has no intervals
    /// but imagery exists. Result is tagged simulated.
    async fn fetch_image_scalar(
        &self,
        center: Coordinates,
        range: DateRange,
    ) -> AgroResult<Observation> {
        let token = self.tokens.bearer_token(PROVIDER_NAME).await?;
        let bbox = BoundingBox::around(center, FIELD_BBOX_HALF_DEG);

        let body = json!({
            "input": {
                "bounds": {
                    "bbox": [bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat],
                    "properties": { "crs": "http://www.opengis.net/def/crs/EPSG/0/4326" }
                },
                "data": [{
                    "type": "sentinel-2-l2a",
                    "dataFilter": {
                        "timeRange": {
                            "from": range.start_datetime().to_rfc3339(),
                            "to": range.end_datetime().to_rfc3339()
                        }
                    }
                }]
            },
            "output": { "width": 64, "height": 64 },
            "evalscript": NDVI_EVALSCRIPT
        });

        let url = format!("{}/api/v1/process", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("process request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("process HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| AgroError::ProviderPayload {
            provider: PROVIDER_NAME.to_string(),
            message: format!("image body read failed: {}", e),
        })?;

        let value = ndvi_from_image_bytes(&bytes).ok_or_else(|| AgroError::ProviderPayload {
            provider: PROVIDER_NAME.to_string(),
            message: "empty image body".to_string(),
        })?;

        warn!(
            value = value,
            "Reduced scene image to byte-average scalar; low-fidelity estimate"
        );

        Ok(Observation {
            kind: IndexKind::Ndvi,
            value,
            captured_on: range.end,
            map_url: None,
            provider: PROVIDER_NAME.to_string(),
            provenance: Provenance::Simulated,
        })
    }
}

#[async_trait]
impl IndexProvider for SentinelHubProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    #[instrument(skip(self), fields(provider = PROVIDER_NAME, kind = %kind))]
    async fn fetch_index(
        &self,
        kind: IndexKind,
        center: Coordinates,
        range: DateRange,
    ) -> AgroResult<Observation> {
        match kind {
            IndexKind::Ndvi | IndexKind::Ndwi => {
                let evalscript = Self::evalscript(kind).expect("native evalscript");
                match self.fetch_statistics(evalscript, center, range).await {
                    Ok((mean, captured_on)) => {
                        let value = clamp_ratio(mean);
                        debug!(value = value, captured_on = %captured_on, "Statistics interval");
                        Ok(Observation {
                            kind,
                            value,
                            captured_on,
                            map_url: None,
                            provider: PROVIDER_NAME.to_string(),
                            provenance: Provenance::Satellite,
                        })
                    }
                    // Statistics came back empty but a scene may still
                    // render; only NDVI has an image reduction.
                    Err(AgroError::ProviderPayload { .. }) if kind == IndexKind::Ndvi => {
                        self.fetch_image_scalar(center, range).await
                    }
                    Err(e) => Err(e),
                }
            }
            IndexKind::Evi => {
                // No native EVI evalscript configured; derive from NDVI.
                let ndvi = self
                    .fetch_statistics(NDVI_EVALSCRIPT, center, range)
                    .await?;
                Ok(Observation {
                    kind,
                    value: evi_from_ndvi(clamp_ratio(ndvi.0)),
                    captured_on: ndvi.1,
                    map_url: None,
                    provider: PROVIDER_NAME.to_string(),
                    provenance: Provenance::Simulated,
                })
            }
            _ => Err(AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("no evalscript configured for index '{}'", kind),
            }),
        }
    }
}

fn parse_interval_date(from: &str) -> AgroResult<NaiveDate> {
    // Interval timestamps look like "2024-05-03T00:00:00Z"; the date
    // prefix is all we keep.
    let date_part = from.get(..10).unwrap_or(from);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| AgroError::ProviderPayload {
        provider: PROVIDER_NAME.to_string(),
        message: format!("unparseable interval timestamp: {}", from),
    })
}

const NDVI_EVALSCRIPT: &str = r#"
//VERSION=3
function setup() {
  return { input: ["B04", "B08", "dataMask"], output: { bands: 1 } };
}
function evaluatePixel(sample) {
  return [(sample.B08 - sample.B04) / (sample.B08 + sample.B04)];
}
"#;

const NDWI_EVALSCRIPT: &str = r#"
//VERSION=3
function setup() {
  return { input: ["B03", "B08", "dataMask"], output: { bands: 1 } };
}
function evaluatePixel(sample) {
  return [(sample.B03 - sample.B08) / (sample.B03 + sample.B08)];
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_date() {
        let date = parse_interval_date("2024-05-03T00:00:00Z").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
        assert!(parse_interval_date("garbage").is_err());
    }

    #[test]
    fn test_statistical_decode() {
        let body = r#"{"data":[{
            "interval": {"from": "2024-05-03T00:00:00Z", "to": "2024-05-04T00:00:00Z"},
            "outputs": {"default": {"bands": {"B0": {"stats": {"mean": 0.63}}}}}
        }]}"#;
        let parsed: StatisticalResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].outputs.default.bands.b0.stats.mean, 0.63);
    }

    #[test]
    fn test_native_evalscripts() {
        assert!(SentinelHubProvider::evalscript(IndexKind::Ndvi).is_some());
        assert!(SentinelHubProvider::evalscript(IndexKind::Ndwi).is_some());
        assert!(SentinelHubProvider::evalscript(IndexKind::SoilMoisture).is_none());
    }
}
