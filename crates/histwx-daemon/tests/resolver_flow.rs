//! End-to-end flow: history file -> series -> resolver -> sink

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Duration, Timelike, Utc};

use histwx_archive::{HistoricResolver, HistoricSeries, UpdateOutcome};
use histwx_core::{Observer, SampleEnvelope, SampleSink};
use histwx_sinks::FsSink;

/// Write a fixture file with entries every 30 minutes around the current
/// wall-clock time, the way the scraper lays them out.
fn write_fixture(dir: &Path) -> PathBuf {
    let base = Utc::now()
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap();

    let mut document = String::from("{\n");
    for step in -4i64..=4 {
        let timestamp = base + Duration::minutes(step * 30);
        let _ = write!(
            document,
            "\"{}\": [{}, 87, 13, 1009, \"Passing clouds. Drizzle.\"]",
            timestamp.format("%Y-%m-%d %H:%M"),
            step + 10
        );
        document.push_str(if step == 4 { "\n" } else { ",\n" });
    }
    document.push('}');

    let path = dir.join("history.json");
    std::fs::write(&path, document).unwrap();
    path
}

#[tokio::test]
async fn resolves_and_emits_from_a_history_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path());

    let series = HistoricSeries::load(&path, chrono_tz::UTC, 0).unwrap();
    assert!(!series.is_empty());

    let observer = Observer {
        latitude: 52.52,
        longitude: 13.405,
        elevation: 34.0,
    };
    let mut resolver = HistoricResolver::new(series, chrono_tz::UTC, observer, "fixture", 0, 0);

    // First pass resolves; a second pass at the same instant is throttled
    let now = Utc::now().with_timezone(&chrono_tz::UTC);
    assert_eq!(resolver.update_at(now), UpdateOutcome::Changed);
    assert_eq!(resolver.update_at(now), UpdateOutcome::Throttled);
    assert_eq!(resolver.scan_count(), 1);

    let sample = resolver.current().unwrap();
    assert_eq!(sample.rain, 1);
    assert_eq!(sample.sky, 7);
    assert_eq!(sample.humidity, 87.0);

    // Changed samples round-trip through the fs sink
    let envelope = resolver.envelope().unwrap();
    let mut sink = FsSink::new(dir.path().join("out")).unwrap();
    sink.emit(&envelope).await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("out").join("samples.jsonl")).unwrap();
    let line: SampleEnvelope = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(line.location, "fixture");
    assert_eq!(line.offset_days, 0);
    assert_eq!(line.sample.rain, 1);
}

#[tokio::test]
async fn missing_history_file_fails_at_setup() {
    let dir = tempfile::tempdir().unwrap();
    let result = HistoricSeries::load(dir.path().join("absent.json"), chrono_tz::UTC, 0);
    assert!(result.is_err());
}
