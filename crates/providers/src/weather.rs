//! Weather observation providers for the field dashboard.

use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use agro_common::{AgroError, AgroResult, Coordinates, Provenance};

use crate::stub::StubProvider;
use agro_common::IndexKind;

/// Current conditions at a field centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub precipitation_mm: f64,
    pub wind_speed_ms: f64,
    pub provider: String,
    pub provenance: Provenance,
}

/// A source of current weather for a point.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, center: Coordinates) -> AgroResult<WeatherReport>;
}

const OPEN_METEO_NAME: &str = "open-meteo";

/// Open-Meteo client (keyless).
pub struct OpenMeteoWeather {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: OpenMeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    precipitation: f64,
    wind_speed_10m: f64,
}

impl OpenMeteoWeather {
    pub fn new() -> AgroResult<Self> {
        Self::with_base_url("https://api.open-meteo.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> AgroResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AgroError::InternalError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    #[instrument(skip(self), fields(provider = OPEN_METEO_NAME))]
    async fn current(&self, center: Coordinates) -> AgroResult<WeatherReport> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", format!("{:.4}", center.latitude)),
                ("longitude", format!("{:.4}", center.longitude)),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m".to_string(),
                ),
            ])
            .send()
            .await
            .map_err(|e| AgroError::ProviderRequest {
                provider: OPEN_METEO_NAME.to_string(),
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AgroError::ProviderRequest {
                provider: OPEN_METEO_NAME.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let body: OpenMeteoResponse =
            response.json().await.map_err(|e| AgroError::ProviderPayload {
                provider: OPEN_METEO_NAME.to_string(),
                message: format!("body decode failed: {}", e),
            })?;

        debug!(
            temperature_c = body.current.temperature_2m,
            humidity = body.current.relative_humidity_2m,
            "Weather observation"
        );

        Ok(WeatherReport {
            temperature_c: body.current.temperature_2m,
            humidity_percent: body.current.relative_humidity_2m,
            precipitation_mm: body.current.precipitation,
            wind_speed_ms: body.current.wind_speed_10m,
            provider: OPEN_METEO_NAME.to_string(),
            provenance: Provenance::Satellite,
        })
    }
}

/// Deterministic weather stand-in, seeded like the index stub.
#[derive(Debug, Default)]
pub struct StubWeather;

impl StubWeather {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WeatherProvider for StubWeather {
    async fn current(&self, center: Coordinates) -> AgroResult<WeatherReport> {
        let today = chrono::Utc::now().date_naive();
        let seed = StubProvider::seed(center, today, IndexKind::SoilMoisture);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(0x57_45_41_54)); // "WEAT"

        Ok(WeatherReport {
            temperature_c: rng.gen_range(8.0..38.0),
            humidity_percent: rng.gen_range(20.0..90.0),
            precipitation_mm: if rng.gen_bool(0.25) {
                rng.gen_range(0.1..12.0)
            } else {
                0.0
            },
            wind_speed_ms: rng.gen_range(0.5..12.0),
            provider: "stub".to_string(),
            provenance: Provenance::Simulated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_weather_in_plausible_bands() {
        let report = StubWeather::new()
            .current(Coordinates::new(30.05, 31.23))
            .await
            .unwrap();
        assert!((8.0..38.0).contains(&report.temperature_c));
        assert!((20.0..90.0).contains(&report.humidity_percent));
        assert_eq!(report.provenance, Provenance::Simulated);
    }

    #[test]
    fn test_open_meteo_decode() {
        let body = r#"{"current":{
            "temperature_2m": 24.3,
            "relative_humidity_2m": 41.0,
            "precipitation": 0.0,
            "wind_speed_10m": 3.7
        }}"#;
        let parsed: OpenMeteoResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.current.temperature_2m, 24.3);
    }
}
