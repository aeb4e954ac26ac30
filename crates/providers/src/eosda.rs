//! EOSDA vegetation statistics client.
//!
//! Auth is a static API key passed as a query parameter. The client
//! returns the most recent scene statistic inside the requested range.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use agro_common::{
    index::clamp_ratio, AgroError, AgroResult, Coordinates, DateRange, IndexKind, Observation,
    Provenance,
};

use crate::IndexProvider;
use async_trait::async_trait;

const PROVIDER_NAME: &str = "eosda";

/// EOSDA statistics API client.
pub struct EosdaProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct StatisticsResponse {
    #[serde(default)]
    result: Vec<SceneStatistic>,
}

#[derive(Debug, Deserialize)]
struct SceneStatistic {
    date: String,
    average: f64,
    #[serde(default)]
    map_url: Option<String>,
}

impl EosdaProvider {
    pub fn new(api_key: String, base_url: String) -> AgroResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AgroError::InternalError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn remote_series(kind: IndexKind) -> Option<&'static str> {
        match kind {
            IndexKind::Ndvi => Some("NDVI"),
            IndexKind::Ndwi => Some("NDWI"),
            IndexKind::Chlorophyll => Some("CCCI"),
            IndexKind::SoilMoisture => Some("SOIL_MOISTURE"),
            // EVI/NRI/DSWI have no remote series; the pipeline derives them.
            _ => None,
        }
    }
}

#[async_trait]
impl IndexProvider for EosdaProvider {
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
        let series = Self::remote_series(kind).ok_or_else(|| AgroError::ProviderRequest {
            provider: PROVIDER_NAME.to_string(),
            message: format!("no remote series for index '{}'", kind),
        })?;

        let url = format!("{}/api/vi/statistics", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("index", series.to_string()),
                ("lat", format!("{:.6}", center.latitude)),
                ("lon", format!("{:.6}", center.longitude)),
                ("date_start", range.start.format("%Y-%m-%d").to_string()),
                ("date_end", range.end.format("%Y-%m-%d").to_string()),
                ("api_key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AgroError::ProviderRequest {
                provider: PROVIDER_NAME.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let stats: StatisticsResponse =
            response.json().await.map_err(|e| AgroError::ProviderPayload {
                provider: PROVIDER_NAME.to_string(),
                message: format!("body decode failed: {}", e),
            })?;

        // Most recent scene wins.
        let scene = stats
            .result
            .into_iter()
            .max_by(|a, b| a.date.cmp(&b.date))
            .ok_or_else(|| AgroError::ProviderPayload {
                provider: PROVIDER_NAME.to_string(),
                message: "no scenes in requested range".to_string(),
            })?;

        let captured_on = NaiveDate::parse_from_str(&scene.date, "%Y-%m-%d").map_err(|_| {
            AgroError::ProviderPayload {
                provider: PROVIDER_NAME.to_string(),
                message: format!("unparseable scene date: {}", scene.date),
            }
        })?;

        let value = if kind.is_ratio() {
            clamp_ratio(scene.average)
        } else {
            scene.average
        };

        debug!(value = value, captured_on = %captured_on, "EOSDA scene statistic");

        Ok(Observation {
            kind,
            value,
            captured_on,
            map_url: scene.map_url,
            provider: PROVIDER_NAME.to_string(),
            provenance: Provenance::Satellite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_series_mapping() {
        assert_eq!(EosdaProvider::remote_series(IndexKind::Ndvi), Some("NDVI"));
        assert_eq!(EosdaProvider::remote_series(IndexKind::Evi), None);
        assert_eq!(EosdaProvider::remote_series(IndexKind::Dswi), None);
    }

    #[test]
    fn test_statistics_decode_picks_latest() {
        let body = r#"{"result":[
            {"date":"2024-05-01","average":0.41},
            {"date":"2024-05-03","average":0.52,"map_url":"https://tiles.example/a.png"}
        ]}"#;
        let stats: StatisticsResponse = serde_json::from_str(body).unwrap();
        let latest = stats
            .result
            .into_iter()
            .max_by(|a, b| a.date.cmp(&b.date))
            .unwrap();
        assert_eq!(latest.date, "2024-05-03");
        assert_eq!(latest.average, 0.52);
        assert!(latest.map_url.is_some());
    }
}
