//! Data source contract and wire payload types
//!
//! The poll loop is written against [`DataSource`] rather than a concrete
//! HTTP client, so the same loop runs against the real backend
//! ([`HttpSource`](super::client::HttpSource)) and the synthetic one
//! ([`MockSource`](super::mock::MockSource)) used by tests and `--mock`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;

/// One live sample packet from the backend.
///
/// `data` maps register names to raw values. Names not present in the
/// schema are ignored; schema-declared names missing from `data` render as
/// N/A. A present `error` field means the packet carries no usable data
/// and the tick is skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveSample {
    /// Server-side capture time, ISO-8601; client clock is the fallback
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub data: HashMap<String, Value>,

    #[serde(default)]
    pub error: Option<String>,
}

impl LiveSample {
    /// Parse the server timestamp, falling back to `now` when it is
    /// absent or unparseable (a delayed packet must never reorder points,
    /// so ordering always follows this resolved value, not arrival time).
    pub fn resolved_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(raw) = self.timestamp.as_deref() else {
            return now;
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return ts.with_timezone(&Utc);
        }
        // Backends frequently emit naive ISO timestamps; treat them as UTC.
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return naive.and_utc();
        }
        tracing::warn!("Unparseable sample timestamp '{}', using client time", raw);
        now
    }

    /// Raw value for a register, if the packet carries one
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// One historical record: a timestamp plus register columns.
///
/// Records arrive in arbitrary order; the windowing store sorts on seed.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(flatten)]
    pub values: HashMap<String, Value>,
}

impl HistoryRecord {
    /// Parse this record's timestamp; `None` drops the record
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Time range selector for history and export queries.
///
/// Relative ranges use the backend's token grammar (`30m`, `1h`, `7d`,
/// `4w`). Custom ranges are formatted as local wall-clock timestamps at
/// minute precision (seconds zeroed); the backend interprets them in its
/// fixed site offset, which is a server-side property, not configurable
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryRange {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    Weeks(u32),
    Custom {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl HistoryRange {
    /// Query parameters for this range
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
        match self {
            HistoryRange::Custom { start, end } => vec![
                ("range", "custom".to_string()),
                ("start", start.format(MINUTE_FORMAT).to_string()),
                ("end", end.format(MINUTE_FORMAT).to_string()),
            ],
            relative => vec![("range", relative.to_string())],
        }
    }
}

impl std::fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryRange::Minutes(n) => write!(f, "{}m", n),
            HistoryRange::Hours(n) => write!(f, "{}h", n),
            HistoryRange::Days(n) => write!(f, "{}d", n),
            HistoryRange::Weeks(n) => write!(f, "{}w", n),
            HistoryRange::Custom { .. } => write!(f, "custom"),
        }
    }
}

/// Abstract backend the poll loop fetches from.
///
/// Implementations take `&mut self` because sources may hold connection
/// state or (for the mock) advance an internal clock per call.
pub trait DataSource: Send {
    /// Fetch the register definition document (raw, pre-validation)
    fn fetch_schema(&mut self) -> Result<Value>;

    /// Fetch the latest live sample
    fn fetch_live(&mut self) -> Result<LiveSample>;

    /// Fetch historical records for a range, arbitrary order
    fn fetch_history(&mut self, range: &HistoryRange) -> Result<Vec<HistoryRecord>>;

    /// Fetch the CSV export payload for a range; the caller persists it
    fn export_csv(&mut self, range: &HistoryRange, variables: Option<&[String]>)
        -> Result<Vec<u8>>;

    /// Install or clear the auth token for subsequent requests
    fn set_token(&mut self, token: Option<String>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    #[test]
    fn test_live_sample_deserialization() {
        let sample: LiveSample = serde_json::from_value(json!({
            "timestamp": "2026-08-07T10:00:00+00:00",
            "data": {"SOC1": 42.5, "Sys_Status": 3}
        }))
        .unwrap();
        assert!(sample.error.is_none());
        assert_eq!(sample.value("SOC1"), Some(&json!(42.5)));
        assert!(sample.value("missing").is_none());
    }

    #[test]
    fn test_live_sample_error_field() {
        let sample: LiveSample =
            serde_json::from_value(json!({"error": "no rows"})).unwrap();
        assert_eq!(sample.error.as_deref(), Some("no rows"));
        assert!(sample.data.is_empty());
    }

    #[test]
    fn test_timestamp_resolution() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();

        let with_offset = LiveSample {
            timestamp: Some("2026-08-07T10:00:00+02:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            with_offset.resolved_timestamp(now),
            Utc.with_ymd_and_hms(2026, 8, 7, 8, 0, 0).unwrap()
        );

        let naive = LiveSample {
            timestamp: Some("2026-08-07T09:30:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            naive.resolved_timestamp(now),
            Utc.with_ymd_and_hms(2026, 8, 7, 9, 30, 0).unwrap()
        );

        let garbage = LiveSample {
            timestamp: Some("yesterday-ish".to_string()),
            ..Default::default()
        };
        assert_eq!(garbage.resolved_timestamp(now), now);

        let absent = LiveSample::default();
        assert_eq!(absent.resolved_timestamp(now), now);
    }

    #[test]
    fn test_history_record_flattens_columns() {
        let record: HistoryRecord = serde_json::from_value(json!({
            "timestamp": "2026-08-07T09:00:00",
            "CL1_Voltage": 48.2,
            "CL2_Voltage": null
        }))
        .unwrap();
        assert!(record.parsed_timestamp().is_some());
        assert_eq!(record.values.get("CL1_Voltage"), Some(&json!(48.2)));
        assert_eq!(record.values.get("CL2_Voltage"), Some(&json!(null)));
    }

    #[test]
    fn test_relative_range_tokens() {
        assert_eq!(HistoryRange::Minutes(30).to_string(), "30m");
        assert_eq!(HistoryRange::Hours(1).to_string(), "1h");
        assert_eq!(HistoryRange::Days(7).to_string(), "7d");
        assert_eq!(HistoryRange::Weeks(4).to_string(), "4w");
        assert_eq!(
            HistoryRange::Minutes(30).query_pairs(),
            vec![("range", "30m".to_string())]
        );
    }

    #[test]
    fn test_custom_range_minute_precision() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(9, 15, 42)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 2)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        let pairs = HistoryRange::Custom { start, end }.query_pairs();
        assert_eq!(pairs[0], ("range", "custom".to_string()));
        // Seconds are not transmitted; the backend zero-fills them.
        assert_eq!(pairs[1], ("start", "2026-08-01T09:15".to_string()));
        assert_eq!(pairs[2], ("end", "2026-08-02T18:00".to_string()));
    }
}
