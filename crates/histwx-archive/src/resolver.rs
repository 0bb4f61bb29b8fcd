//! Throttled historic sample resolution

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use histwx_core::{
    classify_condition, moon, AttributeKey, Observer, PhaseLabel, ResolvedSample, SampleEnvelope,
    SampleValue,
};

use crate::series::HistoricSeries;
use crate::{ArchiveError, ArchiveResult};

/// Outcome of one update pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Called again within the same clock minute; nothing was recomputed
    Throttled,

    /// Recomputed, but the cached sample stands (either nothing qualified
    /// past the cutoff, or the recomputed sample was identical)
    Unchanged,

    /// A new sample replaced the cached one
    Changed,
}

/// Resolves historic samples for one configured (location, offset) group.
///
/// Owns the loaded series, the cached sample, and the minute-granularity
/// throttle. One instance per sensor group; never shared.
pub struct HistoricResolver {
    series: HistoricSeries,
    timezone: Tz,
    observer: Observer,
    location: String,
    offset_days: u32,
    offset_hours: u32,
    sample: Option<ResolvedSample>,
    record_key: Option<String>,
    phase: Option<PhaseLabel>,
    last_tick: Option<DateTime<Tz>>,
    scans: u64,
}

impl HistoricResolver {
    pub fn new(
        series: HistoricSeries,
        timezone: Tz,
        observer: Observer,
        location: impl Into<String>,
        offset_days: u32,
        offset_hours: u32,
    ) -> Self {
        Self {
            series,
            timezone,
            observer,
            location: location.into(),
            offset_days,
            offset_hours,
            sample: None,
            record_key: None,
            phase: None,
            last_tick: None,
            scans: 0,
        }
    }

    /// Recompute the current sample against the wall clock.
    pub fn update(&mut self) -> UpdateOutcome {
        let now = Utc::now().with_timezone(&self.timezone);
        self.update_at(now)
    }

    /// Recompute the current sample as of `now`.
    ///
    /// Idempotent within one clock minute: a second call with the same
    /// truncated `now` is a no-op. The throttle gate advances even when
    /// nothing qualifies past the cutoff.
    pub fn update_at(&mut self, now: DateTime<Tz>) -> UpdateOutcome {
        let tick = truncate_to_minute(now);
        if self.last_tick == Some(tick) {
            return UpdateOutcome::Throttled;
        }
        self.last_tick = Some(tick);

        let cutoff = tick
            - Duration::days(i64::from(self.offset_days))
            - Duration::hours(i64::from(self.offset_hours));

        self.scans += 1;
        let Some(entry) = self.series.first_after(cutoff) else {
            debug!(
                location = %self.location,
                %cutoff,
                "no record past cutoff, keeping previous sample"
            );
            return UpdateOutcome::Unchanged;
        };

        let report = moon::observe(&self.observer, cutoff.with_timezone(&Utc), self.timezone);
        let codes = classify_condition(&entry.record.condition);
        let sample = ResolvedSample::from_record(&entry.record, codes, report.illumination_code());

        // The phase icon tracks the cutoff even when the sample itself
        // does not change
        self.phase = Some(report.label);

        if self.sample.as_ref() == Some(&sample) {
            return UpdateOutcome::Unchanged;
        }

        debug!(
            location = %self.location,
            record = %entry.key,
            ?sample,
            "resolved new sample"
        );
        self.record_key = Some(entry.key.clone());
        self.sample = Some(sample);
        UpdateOutcome::Changed
    }

    /// Latest resolved sample, if any update has succeeded yet.
    pub fn current(&self) -> Option<&ResolvedSample> {
        self.sample.as_ref()
    }

    /// Read one attribute; fails until the first successful resolution.
    pub fn value(&self, key: AttributeKey) -> ArchiveResult<SampleValue> {
        self.sample
            .as_ref()
            .map(|sample| sample.get(key))
            .ok_or(ArchiveError::MissingSample)
    }

    /// Display icon for the moon attribute, phase-dependent once resolved.
    pub fn moon_icon(&self) -> &'static str {
        self.phase
            .map(PhaseLabel::icon)
            .unwrap_or_else(|| AttributeKey::Moon.icon())
    }

    /// Latest sample wrapped with its provenance, for sinks and the API.
    pub fn envelope(&self) -> Option<SampleEnvelope> {
        let sample = self.sample.clone()?;
        let record_timestamp = self.record_key.clone()?;
        let resolved_at = self.last_tick?.with_timezone(&Utc);
        Some(SampleEnvelope {
            location: self.location.clone(),
            offset_days: self.offset_days,
            offset_hours: self.offset_hours,
            record_timestamp,
            resolved_at,
            sample,
        })
    }

    /// Number of series scans performed so far; the throttle keeps this
    /// from growing faster than once per minute.
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn offset_days(&self) -> u32 {
        self.offset_days
    }

    pub fn offset_hours(&self) -> u32 {
        self.offset_hours
    }
}

fn truncate_to_minute(now: DateTime<Tz>) -> DateTime<Tz> {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}
