//! External satellite/weather provider clients and the synthetic fallback.
//!
//! Every provider implements [`IndexProvider`]; the pipeline treats them
//! uniformly and substitutes [`StubProvider`] output when a real provider
//! is unconfigured, disabled, or fails.

pub mod config;
pub mod eosda;
pub mod sentinel;
pub mod stub;
pub mod token;
pub mod weather;

use async_trait::async_trait;

use agro_common::{AgroResult, Coordinates, DateRange, IndexKind, Observation};

pub use config::ProviderSettings;
pub use eosda::EosdaProvider;
pub use sentinel::SentinelHubProvider;
pub use stub::StubProvider;
pub use token::{Clock, SystemClock, TokenCache};
pub use weather::{OpenMeteoWeather, StubWeather, WeatherProvider, WeatherReport};

/// A source of numeric index observations for a point on the globe.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Provider name as recorded in scene rows and response payloads.
    fn name(&self) -> &'static str;

    /// Fetch one index value for the area around `center` within `range`.
    ///
    /// Implementations must fail loudly on HTTP errors or malformed
    /// payloads, never return a silent zero; the caller decides whether
    /// to degrade to synthetic data.
    async fn fetch_index(
        &self,
        kind: IndexKind,
        center: Coordinates,
        range: DateRange,
    ) -> AgroResult<Observation>;
}

/// Build the real-provider chain from settings, in preference order.
/// The stub is not part of the chain; the pipeline substitutes it when
/// every configured provider fails or none is configured.
pub fn build_providers(settings: &ProviderSettings) -> Vec<Box<dyn IndexProvider>> {
    let mut chain: Vec<Box<dyn IndexProvider>> = Vec::new();

    if let Some(eosda) = &settings.eosda {
        match EosdaProvider::new(eosda.api_key.clone(), eosda.base_url.clone()) {
            Ok(p) => chain.push(Box::new(p)),
            Err(e) => tracing::warn!(error = %e, "EOSDA client construction failed, skipping"),
        }
    }

    if let Some(sentinel) = &settings.sentinel {
        match SentinelHubProvider::new(
            sentinel.client_id.clone(),
            sentinel.client_secret.clone(),
            sentinel.base_url.clone(),
        ) {
            Ok(p) => chain.push(Box::new(p)),
            Err(e) => tracing::warn!(error = %e, "Sentinel Hub client construction failed, skipping"),
        }
    }

    chain
}
