//! Pre-trimmed historic time-series loading

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use histwx_core::HistoricRecord;

use crate::{ArchiveError, ArchiveResult};

/// Timestamp key format used by the scraped documents
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Positional layout of one record in the scraped document
#[derive(Debug, Deserialize)]
struct RawRecord(f64, f64, f64, f64, String);

/// One parsed entry, in file order
#[derive(Debug, Clone)]
pub struct SeriesEntry {
    /// Naive local timestamp parsed from the document key
    pub timestamp: NaiveDateTime,

    /// Original document key, kept for provenance in emitted envelopes
    pub key: String,

    pub record: HistoricRecord,
}

/// A year's worth of scraped weather records, trimmed at load time to the
/// configured day offset and kept in file order.
///
/// The source file is chronological ascending; scans rely on that order
/// and stop at the first qualifying entry.
#[derive(Debug, Clone)]
pub struct HistoricSeries {
    entries: Vec<SeriesEntry>,
}

impl HistoricSeries {
    /// Load a history file and trim it to records at or after
    /// `now - offset_days`.
    ///
    /// Only whole days are subtracted here; the per-update cutoff applies
    /// the hour offset as well, so the trim always leaves slack ahead of
    /// any cutoff the resolver can compute.
    pub fn load<P: AsRef<Path>>(path: P, tz: Tz, offset_days: u32) -> ArchiveResult<Self> {
        let raw = fs::read_to_string(path)?;
        let start = Utc::now().with_timezone(&tz) - Duration::days(i64::from(offset_days));
        Self::from_raw(&raw, &start.format("%Y-%m-%d").to_string())
    }

    /// Parse the document tail beginning at the first occurrence of
    /// `start_date` (a `YYYY-MM-DD` string).
    pub fn from_raw(raw: &str, start_date: &str) -> ArchiveResult<Self> {
        let position = raw
            .find(start_date)
            .ok_or_else(|| ArchiveError::StartDateNotFound {
                date: start_date.to_string(),
            })?;

        // Back up one byte so the key's opening quote survives the slice,
        // then synthesize the opening brace the tail lost.
        let tail = &raw[position.saturating_sub(1)..];
        let document = format!("{{\n{tail}");
        let parsed: serde_json::Map<String, Value> = serde_json::from_str(&document)?;

        let mut entries = Vec::with_capacity(parsed.len());
        for (key, value) in parsed {
            let timestamp = NaiveDateTime::parse_from_str(&key, TIMESTAMP_FORMAT)
                .map_err(|_| ArchiveError::InvalidTimestamp { key: key.clone() })?;
            let RawRecord(temperature, humidity, windspeed, pressure, condition) =
                serde_json::from_value(value).map_err(|e| ArchiveError::InvalidRecord {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;

            entries.push(SeriesEntry {
                timestamp,
                key,
                record: HistoricRecord {
                    temperature,
                    humidity,
                    windspeed,
                    pressure,
                    condition,
                },
            });
        }

        Ok(Self { entries })
    }

    /// First entry whose local instant is strictly after `cutoff`.
    ///
    /// Entries are visited in file order. Ambiguous local times resolve to
    /// the earlier instant; nonexistent ones (DST gap) are skipped.
    pub fn first_after(&self, cutoff: DateTime<Tz>) -> Option<&SeriesEntry> {
        let tz = cutoff.timezone();
        self.entries.iter().find(|entry| {
            match tz.from_local_datetime(&entry.timestamp).earliest() {
                Some(instant) => instant > cutoff,
                None => false,
            }
        })
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
"2024-01-01 00:00": [2, 87, 13, 1009, "Passing clouds."],
"2024-01-01 12:00": [5, 72, 9, 1012, "Partly cloudy."],
"2024-01-02 00:00": [3, 90, 20, 1001, "Heavy rain. Overcast."],
"2024-01-02 12:00": [4, 85, 17, 1003, "Light rain. Low clouds."]
}"#;

    fn utc_cutoff(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Tz> {
        chrono_tz::UTC
            .with_ymd_and_hms(y, mo, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_from_raw_mid_file_drops_prefix() {
        let series = HistoricSeries::from_raw(RAW, "2024-01-02").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.entries()[0].key, "2024-01-02 00:00");
    }

    #[test]
    fn test_from_raw_head_of_file_keeps_everything() {
        let series = HistoricSeries::from_raw(RAW, "2024-01-01").unwrap();
        assert_eq!(series.len(), 4);
    }

    #[test]
    fn test_missing_start_date_is_an_error() {
        let result = HistoricSeries::from_raw(RAW, "2023-06-15");
        assert!(matches!(
            result,
            Err(ArchiveError::StartDateNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let result = HistoricSeries::from_raw("\"2024-01-01 00:00\": [2, 87", "2024-01-01");
        assert!(matches!(result, Err(ArchiveError::Malformed(_))));
    }

    #[test]
    fn test_bad_timestamp_key_is_an_error() {
        let raw = r#"{
"2024-01-01T00:00": [2, 87, 13, 1009, "Sunny."]
}"#;
        let result = HistoricSeries::from_raw(raw, "2024-01-01");
        assert!(matches!(result, Err(ArchiveError::InvalidTimestamp { .. })));
    }

    #[test]
    fn test_short_record_is_an_error() {
        let raw = r#"{
"2024-01-01 00:00": [2, 87, 13]
}"#;
        let result = HistoricSeries::from_raw(raw, "2024-01-01");
        assert!(matches!(result, Err(ArchiveError::InvalidRecord { .. })));
    }

    #[test]
    fn test_first_after_selects_first_strictly_later_entry() {
        let series = HistoricSeries::from_raw(RAW, "2024-01-01").unwrap();
        let entry = series.first_after(utc_cutoff(2024, 1, 1, 12)).unwrap();
        // The 12:00 entry is not strictly after the cutoff
        assert_eq!(entry.key, "2024-01-02 00:00");
    }

    #[test]
    fn test_first_after_past_series_end_is_none() {
        let series = HistoricSeries::from_raw(RAW, "2024-01-01").unwrap();
        assert!(series.first_after(utc_cutoff(2024, 1, 2, 12)).is_none());
    }

    #[test]
    fn test_entries_preserve_file_order() {
        let series = HistoricSeries::from_raw(RAW, "2024-01-01").unwrap();
        let keys: Vec<_> = series.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "2024-01-01 00:00",
                "2024-01-01 12:00",
                "2024-01-02 00:00",
                "2024-01-02 12:00"
            ]
        );
    }
}
