//! Per-field batch processing with partial-failure tolerance.
//!
//! The nightly job walks every field sequentially: fetch a scene, persist
//! it, update the field's denormalized columns. One field's failure is
//! recorded and the loop continues; the summary carries a per-field audit
//! trail.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use agro_common::{AgroResult, Coordinates, DateRange, Provenance};
use pipeline::FieldIndexService;
use storage::{Catalog, FieldRecord, NewReading, NewScene};

/// One fetched scene plus its derived index values, ready to persist.
#[derive(Debug, Clone)]
pub struct SceneData {
    pub provider: String,
    pub captured_at: DateTime<Utc>,
    pub ndvi: f64,
    pub evi: f64,
    pub ndwi: f64,
    pub chlorophyll: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub provenance: Provenance,
    pub metadata: Option<serde_json::Value>,
}

/// Scene acquisition seam. `None` means no scene was available.
#[async_trait]
pub trait SceneSource: Send + Sync {
    async fn fetch_scene(&self, field: &FieldRecord, date: NaiveDate) -> Option<SceneData>;
}

/// Persistence seam for the three-step write.
#[async_trait]
pub trait SceneSink: Send + Sync {
    async fn persist(&self, field: &FieldRecord, scene: &SceneData) -> AgroResult<()>;
}

/// Why a field was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// No owner user id; persisted scenes must be attributable for
    /// row-level authorization.
    MissingOwner,
    /// The scene source yielded nothing.
    NoScene,
}

/// Why a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailReason {
    PersistenceError,
}

/// Outcome of one field in a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Inserted,
    Skipped { reason: SkipReason },
    Failed { reason: FailReason },
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldOutcome {
    pub field_id: Uuid,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// Audit summary of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<FieldOutcome>,
}

impl BatchSummary {
    fn record(&mut self, field_id: Uuid, status: FieldStatus) {
        self.processed += 1;
        match &status {
            FieldStatus::Inserted => self.inserted += 1,
            FieldStatus::Skipped { .. } => self.skipped += 1,
            FieldStatus::Failed { .. } => self.failed += 1,
        }
        self.details.push(FieldOutcome { field_id, status });
    }
}

/// Sequential batch driver over a scene source and sink.
pub struct BatchProcessor<S, K> {
    source: S,
    sink: K,
}

impl<S: SceneSource, K: SceneSink> BatchProcessor<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self { source, sink }
    }

    /// Process each field for `date`, one at a time.
    #[instrument(skip(self, fields), fields(count = fields.len(), date = %date))]
    pub async fn process_fields(&self, fields: &[FieldRecord], date: NaiveDate) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for field in fields {
            if field.owner_id.is_none() {
                warn!(field_id = %field.id, "Field has no owner, skipping");
                summary.record(
                    field.id,
                    FieldStatus::Skipped {
                        reason: SkipReason::MissingOwner,
                    },
                );
                continue;
            }

            let Some(scene) = self.source.fetch_scene(field, date).await else {
                summary.record(
                    field.id,
                    FieldStatus::Skipped {
                        reason: SkipReason::NoScene,
                    },
                );
                continue;
            };

            match self.sink.persist(field, &scene).await {
                Ok(()) => {
                    info!(field_id = %field.id, provider = %scene.provider, "Persisted scene");
                    summary.record(field.id, FieldStatus::Inserted);
                }
                Err(e) => {
                    error!(field_id = %field.id, error = %e, "Persistence failed, continuing batch");
                    summary.record(
                        field.id,
                        FieldStatus::Failed {
                            reason: FailReason::PersistenceError,
                        },
                    );
                }
            }
        }

        info!(
            processed = summary.processed,
            inserted = summary.inserted,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch run complete"
        );

        summary
    }
}

/// Scene source backed by the aggregation pipeline.
pub struct PipelineSceneSource {
    service: FieldIndexService,
    /// Scene search window length, days back from the batch date.
    pub lookback_days: i64,
}

impl PipelineSceneSource {
    pub fn new(service: FieldIndexService, lookback_days: i64) -> Self {
        Self {
            service,
            lookback_days,
        }
    }
}

#[async_trait]
impl SceneSource for PipelineSceneSource {
    async fn fetch_scene(&self, field: &FieldRecord, date: NaiveDate) -> Option<SceneData> {
        let center: Coordinates = field.centroid()?;
        let range = DateRange::trailing_days(date, self.lookback_days);

        let indices = self.service.fetch_field_indices(center, range).await;
        let ndvi = indices.ndvi?;
        let evi = indices.evi?;
        let ndwi = indices.ndwi?;

        Some(SceneData {
            provider: ndvi.provider.clone(),
            captured_at: ndvi
                .captured_on
                .and_hms_opt(0, 0, 0)
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))?,
            ndvi: ndvi.latest,
            evi: evi.latest,
            ndwi: ndwi.latest,
            chlorophyll: indices.chlorophyll.as_ref().map(|s| s.latest),
            soil_moisture: indices.soil_moisture.as_ref().map(|s| s.latest),
            provenance: ndvi.provenance,
            metadata: None,
        })
    }
}

/// Sink that writes scene + reading rows and refreshes the field columns.
pub struct CatalogSink {
    catalog: Catalog,
}

impl CatalogSink {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[async_trait]
impl SceneSink for CatalogSink {
    async fn persist(&self, field: &FieldRecord, scene: &SceneData) -> AgroResult<()> {
        let source = match scene.provenance {
            Provenance::Satellite => "satellite",
            Provenance::Simulated => "simulated",
        };

        let scene_id = self
            .catalog
            .insert_scene(&NewScene {
                field_id: field.id,
                provider: scene.provider.clone(),
                captured_at: scene.captured_at,
                image: None,
                metadata: scene.metadata.clone(),
            })
            .await?;

        let reading = NewReading::clamped(
            scene.ndvi,
            scene.evi,
            scene.ndwi,
            scene.chlorophyll,
            scene.soil_moisture,
            source.to_string(),
        );
        self.catalog
            .insert_reading(scene_id, field.id, &reading)
            .await?;

        self.catalog
            .update_field_latest(
                field.id,
                reading.ndvi,
                reading.soil_moisture,
                None,
                scene.captured_at,
            )
            .await?;

        Ok(())
    }
}
