//! Vegetation index kinds, derived-value formulas, and provenance tags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The vegetation/soil indices the platform surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Ndvi,
    Evi,
    Ndwi,
    Chlorophyll,
    SoilMoisture,
    Nri,
    Dswi,
}

impl IndexKind {
    /// Indices fetched directly from providers. EVI/NRI/DSWI are
    /// synthesized downstream from NDVI.
    pub fn fetched() -> &'static [IndexKind] {
        &[
            IndexKind::Ndvi,
            IndexKind::Ndwi,
            IndexKind::Chlorophyll,
            IndexKind::SoilMoisture,
        ]
    }

    /// Whether values of this index live on the normalized-ratio scale.
    pub fn is_ratio(&self) -> bool {
        matches!(
            self,
            IndexKind::Ndvi | IndexKind::Evi | IndexKind::Ndwi | IndexKind::Nri | IndexKind::Dswi
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Evi => "evi",
            IndexKind::Ndwi => "ndwi",
            IndexKind::Chlorophyll => "chlorophyll",
            IndexKind::SoilMoisture => "soil_moisture",
            IndexKind::Nri => "nri",
            IndexKind::Dswi => "dswi",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a value came from. The trust tag every consumer keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Real provider observation.
    Satellite,
    /// Locally generated placeholder (stub, derived, or jittered).
    Simulated,
}

/// One numeric result from a provider or the fallback generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub kind: IndexKind,
    pub value: f64,
    pub captured_on: NaiveDate,
    /// Map overlay URL, when the provider renders one.
    pub map_url: Option<String>,
    pub provider: String,
    pub provenance: Provenance,
}

/// Clamp a normalized-ratio index into its physical range.
pub fn clamp_ratio(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

/// EVI approximation when the provider has no native EVI band math.
pub fn evi_from_ndvi(ndvi: f64) -> f64 {
    clamp_ratio(2.5 * (ndvi + 1.0) / 3.0)
}

/// NDWI approximation when the provider has no native NDWI.
pub fn ndwi_from_ndvi(ndvi: f64) -> f64 {
    clamp_ratio(0.5 - ndvi / 2.0)
}

/// Reduce a raw scene image to an NDVI-like scalar.
///
/// Averages a byte sample and rescales avg/255 into [-1, 1]. This is a
/// low-fidelity fallback for providers that return imagery without a
/// numeric statistics payload; it is not a radiometric computation and
/// the result is tagged simulated.
pub fn ndvi_from_image_bytes(data: &[u8]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    // Sample up to 4096 evenly spaced bytes; whole payloads can be MBs.
    let step = (data.len() / 4096).max(1);
    let mut sum = 0u64;
    let mut count = 0u64;
    for byte in data.iter().step_by(step) {
        sum += u64::from(*byte);
        count += 1;
    }
    let avg = sum as f64 / count as f64;
    Some(clamp_ratio(avg / 255.0 * 2.0 - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evi_formula() {
        let ndvi = 0.5;
        assert!((evi_from_ndvi(ndvi) - 2.5 * (ndvi + 1.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_evi_clamped_at_high_ndvi() {
        // 2.5 * (1 + 1) / 3 = 1.666..., must clamp to 1.0
        assert_eq!(evi_from_ndvi(1.0), 1.0);
    }

    #[test]
    fn test_ndwi_formula() {
        assert!((ndwi_from_ndvi(0.4) - 0.3).abs() < 1e-12);
        assert_eq!(ndwi_from_ndvi(-1.0), 1.0);
    }

    #[test]
    fn test_clamp_out_of_range() {
        assert_eq!(clamp_ratio(1.7), 1.0);
        assert_eq!(clamp_ratio(-2.3), -1.0);
        assert_eq!(clamp_ratio(0.25), 0.25);
    }

    #[test]
    fn test_image_bytes_scalar_in_range() {
        let mid = vec![127u8; 1000];
        let v = ndvi_from_image_bytes(&mid).unwrap();
        assert!((-1.0..=1.0).contains(&v));
        assert!(v.abs() < 0.01);

        let bright = vec![255u8; 10];
        assert_eq!(ndvi_from_image_bytes(&bright).unwrap(), 1.0);
    }

    #[test]
    fn test_image_bytes_empty() {
        assert!(ndvi_from_image_bytes(&[]).is_none());
    }
}
