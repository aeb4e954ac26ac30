//! Merged observation timeline for the dashboard.

use serde::{Deserialize, Serialize};

use agro_common::{IndexKind, Observation, Provenance};

/// One dated point in the merged response timeline. Response-only, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// ISO date string; the sort key.
    pub date: String,
    pub kind: IndexKind,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
    pub provenance: Provenance,
}

impl TimelineEntry {
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            date: obs.captured_on.format("%Y-%m-%d").to_string(),
            kind: obs.kind,
            value: obs.value,
            map_url: obs.map_url.clone(),
            provenance: obs.provenance,
        }
    }
}

/// Merge per-index entries into one list, newest first.
///
/// Descending by ISO date string; entries sharing a date keep their
/// insertion order (stable sort), so the caller's push order is the
/// tie-break.
pub fn merge_timeline(mut entries: Vec<TimelineEntry>) -> Vec<TimelineEntry> {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, kind: IndexKind, value: f64) -> TimelineEntry {
        TimelineEntry {
            date: date.to_string(),
            kind,
            value,
            map_url: None,
            provenance: Provenance::Satellite,
        }
    }

    #[test]
    fn test_descending_by_date() {
        let merged = merge_timeline(vec![
            entry("2024-05-01", IndexKind::Ndvi, 0.5),
            entry("2024-05-03", IndexKind::Ndwi, 0.2),
        ]);
        assert_eq!(merged[0].date, "2024-05-03");
        assert_eq!(merged[1].date, "2024-05-01");
    }

    #[test]
    fn test_equal_dates_keep_insertion_order() {
        let merged = merge_timeline(vec![
            entry("2024-05-03", IndexKind::Ndvi, 0.5),
            entry("2024-05-03", IndexKind::Ndwi, 0.2),
            entry("2024-05-03", IndexKind::Evi, 0.7),
        ]);
        assert_eq!(merged[0].kind, IndexKind::Ndvi);
        assert_eq!(merged[1].kind, IndexKind::Ndwi);
        assert_eq!(merged[2].kind, IndexKind::Evi);
    }
}
