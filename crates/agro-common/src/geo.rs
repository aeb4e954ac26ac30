//! Geographic types for field locations.

use serde::{Deserialize, Serialize};

/// A WGS84 point, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check the point is on the globe.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Quantized key fragment, stable across float noise.
    ///
    /// Four decimal places is ~11 m at the equator, finer than any
    /// satellite scene footprint we request.
    pub fn cache_key(&self) -> String {
        format!("{:.4}_{:.4}", self.latitude, self.longitude)
    }
}

/// A geographic bounding box in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Square box of `half_size_deg` degrees around a field centroid.
    ///
    /// Providers take a bbox even for point queries; 0.001 deg (~100 m)
    /// covers a smallholder field without pulling in the neighbours.
    pub fn around(center: Coordinates, half_size_deg: f64) -> Self {
        Self {
            min_lon: center.longitude - half_size_deg,
            min_lat: center.latitude - half_size_deg,
            max_lon: center.longitude + half_size_deg,
            max_lat: center.latitude + half_size_deg,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bbox.
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
            && point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
    }
}
