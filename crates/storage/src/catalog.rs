//! Field/scene/reading catalog using PostgreSQL.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use agro_common::{index::clamp_ratio, AgroError, AgroResult, Coordinates};

use crate::auth::OwnershipCheck;

/// Database connection pool and catalog operations. Cloning shares the
/// underlying pool.
#[derive(Clone)]
pub struct Catalog {
    pool: PgPool,
}

/// One row of the `fields` table, with the denormalized last-known values.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldRecord {
    pub id: Uuid,
    pub farm_id: Uuid,
    /// Legacy single-owner column; newer deployments use `farm_owners`.
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub boundary: Option<serde_json::Value>,
    pub last_ndvi: Option<f64>,
    pub last_moisture: Option<f64>,
    pub last_temperature: Option<f64>,
    pub last_reading_at: Option<DateTime<Utc>>,
}

impl FieldRecord {
    pub fn centroid(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

/// A scene row to insert. Scenes are append-only.
#[derive(Debug, Clone)]
pub struct NewScene {
    pub field_id: Uuid,
    pub provider: String,
    pub captured_at: DateTime<Utc>,
    pub image: Option<Vec<u8>>,
    pub metadata: Option<serde_json::Value>,
}

/// An index-reading row to insert alongside its scene.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub ndvi: f64,
    pub evi: f64,
    pub ndwi: f64,
    pub chlorophyll: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub source: String,
}

impl NewReading {
    /// Build a reading with ratio indices clamped into [-1, 1].
    pub fn clamped(
        ndvi: f64,
        evi: f64,
        ndwi: f64,
        chlorophyll: Option<f64>,
        soil_moisture: Option<f64>,
        source: String,
    ) -> Self {
        Self {
            ndvi: clamp_ratio(ndvi),
            evi: clamp_ratio(evi),
            ndwi: clamp_ratio(ndwi),
            chlorophyll,
            soil_moisture,
            source,
        }
    }
}

impl Catalog {
    /// Create a new catalog connection from database URL.
    pub async fn connect(database_url: &str) -> AgroResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| AgroError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> AgroResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| AgroError::DatabaseError(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    /// Liveness probe for readiness endpoints.
    pub async fn ping(&self) -> AgroResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AgroError::DatabaseError(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    /// Load one field.
    pub async fn get_field(&self, field_id: Uuid) -> AgroResult<Option<FieldRecord>> {
        let row = sqlx::query_as::<_, FieldRecord>(
            "SELECT id, farm_id, owner_id, name, latitude, longitude, boundary, \
             last_ndvi, last_moisture, last_temperature, last_reading_at \
             FROM fields WHERE id = $1",
        )
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AgroError::DatabaseError(format!("Query failed: {}", e)))?;

        Ok(row)
    }

    /// List all fields, batch-processing order.
    pub async fn list_fields(&self) -> AgroResult<Vec<FieldRecord>> {
        let rows = sqlx::query_as::<_, FieldRecord>(
            "SELECT id, farm_id, owner_id, name, latitude, longitude, boundary, \
             last_ndvi, last_moisture, last_temperature, last_reading_at \
             FROM fields ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AgroError::DatabaseError(format!("Query failed: {}", e)))?;

        Ok(rows)
    }

    /// Resolve the ownership check for one request.
    ///
    /// Bridge-table rows win when present; deployments predating the
    /// `farm_owners` migration fall back to the field's legacy owner
    /// column. Resolved once per request, not re-derived ad hoc.
    pub async fn ownership_check(
        &self,
        field: &FieldRecord,
        user_id: Uuid,
    ) -> AgroResult<OwnershipCheck> {
        let bridge_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM farm_owners WHERE farm_id = $1")
                .bind(field.farm_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AgroError::DatabaseError(format!("Query failed: {}", e)))?;

        if bridge_rows > 0 {
            let is_owner: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM farm_owners WHERE farm_id = $1 AND user_id = $2",
            )
            .bind(field.farm_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AgroError::DatabaseError(format!("Query failed: {}", e)))?;

            Ok(OwnershipCheck::BridgeTable {
                is_owner: is_owner > 0,
            })
        } else {
            Ok(OwnershipCheck::LegacyColumn {
                owner_id: field.owner_id,
            })
        }
    }

    /// Insert a satellite scene row. Scenes are immutable once written.
    pub async fn insert_scene(&self, scene: &NewScene) -> AgroResult<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO satellite_images (id, field_id, provider, captured_at, image, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(scene.field_id)
        .bind(&scene.provider)
        .bind(scene.captured_at)
        .bind(&scene.image)
        .bind(&scene.metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AgroError::DatabaseError(format!("Scene insert failed: {}", e)))?;

        Ok(id)
    }

    /// Insert an index reading referencing its scene.
    pub async fn insert_reading(
        &self,
        scene_id: Uuid,
        field_id: Uuid,
        reading: &NewReading,
    ) -> AgroResult<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO ndvi_indices \
             (id, image_id, field_id, ndvi_value, evi_value, ndwi_value, chlorophyll, soil_moisture, source, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(id)
        .bind(scene_id)
        .bind(field_id)
        .bind(reading.ndvi)
        .bind(reading.evi)
        .bind(reading.ndwi)
        .bind(reading.chlorophyll)
        .bind(reading.soil_moisture)
        .bind(&reading.source)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AgroError::DatabaseError(format!("Reading insert failed: {}", e)))?;

        Ok(id)
    }

    /// Update the field's denormalized last-known columns.
    pub async fn update_field_latest(
        &self,
        field_id: Uuid,
        ndvi: f64,
        moisture: Option<f64>,
        temperature: Option<f64>,
        reading_at: DateTime<Utc>,
    ) -> AgroResult<()> {
        sqlx::query(
            "UPDATE fields SET last_ndvi = $2, last_moisture = COALESCE($3, last_moisture), \
             last_temperature = COALESCE($4, last_temperature), last_reading_at = $5 \
             WHERE id = $1",
        )
        .bind(field_id)
        .bind(ndvi)
        .bind(moisture)
        .bind(temperature)
        .bind(reading_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AgroError::DatabaseError(format!("Field update failed: {}", e)))?;

        Ok(())
    }
}

/// Schema owned by the wider platform; this service creates it when absent
/// so local and test environments come up without a separate migration
/// step.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS farms (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS farm_owners (
    farm_id UUID NOT NULL REFERENCES farms(id),
    user_id UUID NOT NULL,
    PRIMARY KEY (farm_id, user_id)
);

CREATE TABLE IF NOT EXISTS fields (
    id UUID PRIMARY KEY,
    farm_id UUID NOT NULL REFERENCES farms(id),
    owner_id UUID,
    name TEXT NOT NULL,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    boundary JSONB,
    last_ndvi DOUBLE PRECISION,
    last_moisture DOUBLE PRECISION,
    last_temperature DOUBLE PRECISION,
    last_reading_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS satellite_images (
    id UUID PRIMARY KEY,
    field_id UUID NOT NULL REFERENCES fields(id),
    provider TEXT NOT NULL,
    captured_at TIMESTAMPTZ NOT NULL,
    image BYTEA,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS ndvi_indices (
    id UUID PRIMARY KEY,
    image_id UUID NOT NULL REFERENCES satellite_images(id),
    field_id UUID NOT NULL REFERENCES fields(id),
    ndvi_value DOUBLE PRECISION NOT NULL,
    evi_value DOUBLE PRECISION NOT NULL,
    ndwi_value DOUBLE PRECISION NOT NULL,
    chlorophyll DOUBLE PRECISION,
    soil_moisture DOUBLE PRECISION,
    source TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_satellite_images_field ON satellite_images(field_id, captured_at DESC);

CREATE INDEX IF NOT EXISTS idx_ndvi_indices_field ON ndvi_indices(field_id, created_at DESC)
"#;
