//! Time handling for satellite observation queries.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An inclusive date range for provider queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Trailing window ending at `end`, the default scene search span.
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    /// Parse "YYYY-MM-DD/YYYY-MM-DD"; a bare date is a single-day range.
    pub fn parse(s: &str) -> Result<Self, DateParseError> {
        if let Some((start, end)) = s.split_once('/') {
            return Ok(Self {
                start: parse_date(start)?,
                end: parse_date(end)?,
            });
        }
        let day = parse_date(s)?;
        Ok(Self {
            start: day,
            end: day,
        })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// Range start as midnight UTC, for providers that want timestamps.
    pub fn start_datetime(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start.and_hms_opt(0, 0, 0).expect("midnight"))
    }

    /// Range end as end-of-day UTC.
    pub fn end_datetime(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.end.and_hms_opt(23, 59, 59).expect("end of day"))
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DateParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("Invalid date format: {0}. Expected 'YYYY-MM-DD'")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = DateRange::parse("2024-05-01/2024-05-31").unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
    }

    #[test]
    fn test_parse_single_day() {
        let range = DateRange::parse("2024-05-03").unwrap();
        assert_eq!(range.start, range.end);
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()));
    }

    #[test]
    fn test_trailing_days() {
        let end = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let range = DateRange::trailing_days(end, 30);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(range.contains(end));
    }

    #[test]
    fn test_bad_format_rejected() {
        assert!(DateRange::parse("05/01/2024").is_err());
    }
}
