//! Common test fixtures for field-monitor tests.

use chrono::NaiveDate;
use uuid::Uuid;

use agro_common::{Coordinates, DateRange};
use storage::FieldRecord;

/// Well-known test coordinates.
pub mod coords {
    use agro_common::Coordinates;

    /// Nile delta farmland, used across the end-to-end scenarios.
    pub fn cairo() -> Coordinates {
        Coordinates::new(30.05, 31.23)
    }

    /// Central European cropland.
    pub fn bavaria() -> Coordinates {
        Coordinates::new(48.4, 11.7)
    }

    /// Off-globe point for degraded-path tests.
    pub fn invalid() -> Coordinates {
        Coordinates::new(120.0, 500.0)
    }
}

/// May 2024, the default scene search window in tests.
pub fn may_2024() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
    )
}

/// Builder for field rows in batch/authorization tests.
pub struct FieldFixture {
    record: FieldRecord,
}

impl FieldFixture {
    pub fn new(name: &str) -> Self {
        let center = coords::cairo();
        Self {
            record: FieldRecord {
                id: Uuid::new_v4(),
                farm_id: Uuid::new_v4(),
                owner_id: Some(Uuid::new_v4()),
                name: name.to_string(),
                latitude: Some(center.latitude),
                longitude: Some(center.longitude),
                boundary: None,
                last_ndvi: None,
                last_moisture: None,
                last_temperature: None,
                last_reading_at: None,
            },
        }
    }

    pub fn without_owner(mut self) -> Self {
        self.record.owner_id = None;
        self
    }

    pub fn without_coordinates(mut self) -> Self {
        self.record.latitude = None;
        self.record.longitude = None;
        self
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.record.owner_id = Some(owner_id);
        self
    }

    pub fn with_centroid(mut self, center: Coordinates) -> Self {
        self.record.latitude = Some(center.latitude);
        self.record.longitude = Some(center.longitude);
        self
    }

    pub fn build(self) -> FieldRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_builder() {
        let field = FieldFixture::new("North plot").without_owner().build();
        assert_eq!(field.name, "North plot");
        assert!(field.owner_id.is_none());
        assert!(field.centroid().is_some());
    }
}
