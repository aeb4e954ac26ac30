//! Index aggregation pipeline.
//!
//! Fans out per-index provider fetches for one field, substitutes
//! simulated values where providers fail or are absent, synthesizes the
//! secondary indices, and assembles the merged timeline. The aggregate
//! call never fails: total breakdown degrades to an all-null shape the
//! dashboard can still render.

pub mod fetch;
pub mod synth;
pub mod timeline;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use agro_common::{AgroError, AgroResult, Coordinates, DateRange, IndexKind, Observation, Provenance};
use providers::{build_providers, IndexProvider, ProviderSettings, StubProvider};

pub use fetch::fetch_with_fallback;
pub use synth::{derive_secondary, mini_history, HistoryPoint};
pub use timeline::{merge_timeline, TimelineEntry};

/// One index slot in the aggregated result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSeries {
    pub latest: f64,
    pub captured_on: NaiveDate,
    pub provider: String,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
    pub history: Vec<HistoryPoint>,
}

impl IndexSeries {
    fn from_observation(obs: &Observation) -> Self {
        Self {
            latest: obs.value,
            captured_on: obs.captured_on,
            provider: obs.provider.clone(),
            provenance: obs.provenance,
            map_url: obs.map_url.clone(),
            history: mini_history(obs),
        }
    }
}

/// Aggregated indices for one field and date range.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FieldIndices {
    pub ndvi: Option<IndexSeries>,
    pub evi: Option<IndexSeries>,
    pub ndwi: Option<IndexSeries>,
    pub chlorophyll: Option<IndexSeries>,
    pub soil_moisture: Option<IndexSeries>,
    pub nri: Option<IndexSeries>,
    pub dswi: Option<IndexSeries>,
    pub timeline: Vec<TimelineEntry>,
    /// True when the pipeline could not produce values at all and the
    /// shape is the all-null placeholder.
    pub degraded: bool,
}

impl FieldIndices {
    /// The all-null shape returned instead of an error.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Default::default()
        }
    }
}

/// Orchestrates provider fetches and fallback substitution for fields.
pub struct FieldIndexService {
    real_providers: Vec<Box<dyn IndexProvider>>,
    stub: StubProvider,
}

impl FieldIndexService {
    /// Build from resolved provider settings.
    pub fn new(settings: &ProviderSettings) -> Self {
        Self::with_providers(build_providers(settings))
    }

    /// Build with an explicit provider chain. Test seam.
    pub fn with_providers(real_providers: Vec<Box<dyn IndexProvider>>) -> Self {
        Self {
            real_providers,
            stub: StubProvider::new(),
        }
    }

    /// Fetch and aggregate all indices for a field centroid.
    ///
    /// Never returns an error: invalid input or total provider breakdown
    /// produces [`FieldIndices::degraded`].
    #[instrument(skip(self), fields(lat = center.latitude, lon = center.longitude))]
    pub async fn fetch_field_indices(&self, center: Coordinates, range: DateRange) -> FieldIndices {
        if !center.is_valid() {
            debug!("Centroid off-globe, returning degraded shape");
            return FieldIndices::degraded();
        }

        // Parallel fan-out; each branch resolves to its own fallback on
        // failure, so no branch can cancel the others.
        let (ndvi, ndwi, chlorophyll, soil_moisture) = futures::join!(
            self.fetch_kind(IndexKind::Ndvi, center, range),
            self.fetch_kind(IndexKind::Ndwi, center, range),
            self.fetch_kind(IndexKind::Chlorophyll, center, range),
            self.fetch_kind(IndexKind::SoilMoisture, center, range),
        );

        // Secondary indices ride on NDVI; no dedicated provider call.
        let evi = derive_secondary(IndexKind::Evi, &ndvi, center);
        let nri = derive_secondary(IndexKind::Nri, &ndvi, center);
        let dswi = derive_secondary(IndexKind::Dswi, &ndvi, center);

        let ordered = [&ndvi, &evi, &ndwi, &chlorophyll, &soil_moisture, &nri, &dswi];
        let timeline = merge_timeline(
            ordered
                .iter()
                .map(|obs| TimelineEntry::from_observation(obs))
                .collect(),
        );

        FieldIndices {
            ndvi: Some(IndexSeries::from_observation(&ndvi)),
            evi: Some(IndexSeries::from_observation(&evi)),
            ndwi: Some(IndexSeries::from_observation(&ndwi)),
            chlorophyll: Some(IndexSeries::from_observation(&chlorophyll)),
            soil_moisture: Some(IndexSeries::from_observation(&soil_moisture)),
            nri: Some(IndexSeries::from_observation(&nri)),
            dswi: Some(IndexSeries::from_observation(&dswi)),
            timeline,
            degraded: false,
        }
    }

    async fn fetch_kind(
        &self,
        kind: IndexKind,
        center: Coordinates,
        range: DateRange,
    ) -> Observation {
        fetch_with_fallback(
            || self.try_real_providers(kind, center, range),
            || self.stub.generate(kind, center, range),
        )
        .await
    }

    /// Try configured providers in preference order, first success wins.
    async fn try_real_providers(
        &self,
        kind: IndexKind,
        center: Coordinates,
        range: DateRange,
    ) -> AgroResult<Observation> {
        let mut last_err = AgroError::ProviderDisabled {
            provider: "none-configured".to_string(),
        };

        for provider in &self.real_providers {
            match provider.fetch_index(kind, center, range).await {
                Ok(obs) => return Ok(obs),
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "Provider failed, trying next");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}
