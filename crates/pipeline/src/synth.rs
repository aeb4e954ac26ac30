//! Synthetic secondary indices and sparkline stand-ins.
//!
//! EVI/NRI/DSWI have no dedicated provider call in the current dashboard
//! surface; they are derived from the fetched NDVI with fixed formulas
//! plus bounded seeded jitter. Advisory placeholder content, always
//! tagged simulated.

use rand::{rngs::StdRng, Rng, SeedableRng};

use agro_common::{
    index::{clamp_ratio, evi_from_ndvi},
    Coordinates, IndexKind, Observation, Provenance,
};
use providers::StubProvider;

/// Jitter half-width applied to each synthesized secondary index.
const JITTER: f64 = 0.015;

/// Offsets applied around a current value to build the five-point
/// mini-history the UI sparkline needs when only one observation exists.
/// An interpolation stand-in, not real time-series data.
const HISTORY_DELTAS: [f64; 5] = [-0.03, -0.02, 0.0, 0.02, 0.01];

/// One sparkline point.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HistoryPoint {
    pub date: chrono::NaiveDate,
    pub value: f64,
}

/// Derive a secondary index observation from the fetched NDVI.
pub fn derive_secondary(kind: IndexKind, ndvi: &Observation, center: Coordinates) -> Observation {
    let seed = StubProvider::seed(center, ndvi.captured_on, kind);
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = rng.gen_range(-JITTER..=JITTER);

    let base = match kind {
        IndexKind::Evi => evi_from_ndvi(ndvi.value),
        IndexKind::Nri => ndvi.value * 0.85 - 0.05,
        IndexKind::Dswi => ndvi.value * 0.7 + 0.1,
        // Only the three synthetic kinds come through here.
        other => panic!("derive_secondary called for fetched index '{}'", other),
    };

    Observation {
        kind,
        value: clamp_ratio(base + jitter),
        captured_on: ndvi.captured_on,
        map_url: None,
        provider: "derived".to_string(),
        provenance: Provenance::Simulated,
    }
}

/// Build the five-point mini-history ending at the observation date.
pub fn mini_history(obs: &Observation) -> Vec<HistoryPoint> {
    HISTORY_DELTAS
        .iter()
        .enumerate()
        .map(|(i, delta)| {
            let days_back = (HISTORY_DELTAS.len() - 1 - i) as i64;
            let value = if obs.kind.is_ratio() {
                clamp_ratio(obs.value + delta)
            } else {
                (obs.value + delta).max(0.0)
            };
            HistoryPoint {
                date: obs.captured_on - chrono::Duration::days(days_back),
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ndvi_obs(value: f64) -> Observation {
        Observation {
            kind: IndexKind::Ndvi,
            value,
            captured_on: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            map_url: None,
            provider: "eosda".to_string(),
            provenance: Provenance::Satellite,
        }
    }

    fn cairo() -> Coordinates {
        Coordinates::new(30.05, 31.23)
    }

    #[test]
    fn test_secondary_deterministic() {
        let ndvi = ndvi_obs(0.5);
        let a = derive_secondary(IndexKind::Evi, &ndvi, cairo());
        let b = derive_secondary(IndexKind::Evi, &ndvi, cairo());
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn test_secondary_jitter_bounded() {
        let ndvi = ndvi_obs(0.5);
        let evi = derive_secondary(IndexKind::Evi, &ndvi, cairo());
        let base = evi_from_ndvi(0.5);
        assert!((evi.value - base).abs() <= JITTER + 1e-12);
        assert_eq!(evi.provenance, Provenance::Simulated);
    }

    #[test]
    fn test_secondary_clamped() {
        // NDVI at the ceiling pushes the EVI formula past 1.0; jitter must
        // not let the clamp leak.
        let ndvi = ndvi_obs(1.0);
        let evi = derive_secondary(IndexKind::Evi, &ndvi, cairo());
        assert!(evi.value <= 1.0);
    }

    #[test]
    fn test_mini_history_shape() {
        let obs = ndvi_obs(0.5);
        let history = mini_history(&obs);
        assert_eq!(history.len(), 5);
        // Ends at the observation date, ascending by day.
        assert_eq!(history[4].date, obs.captured_on);
        assert_eq!(history[0].date, obs.captured_on - chrono::Duration::days(4));
        assert_eq!(history[2].value, 0.5);
        assert!((history[0].value - 0.47).abs() < 1e-12);
    }

    #[test]
    fn test_mini_history_respects_ratio_clamp() {
        let obs = ndvi_obs(0.99);
        let history = mini_history(&obs);
        assert!(history.iter().all(|p| p.value <= 1.0));
    }

    #[test]
    fn test_mini_history_non_ratio_floor() {
        let obs = Observation {
            kind: IndexKind::SoilMoisture,
            value: 0.01,
            ..ndvi_obs(0.0)
        };
        let history = mini_history(&obs);
        assert!(history.iter().all(|p| p.value >= 0.0));
    }
}
