//! Lunar phase, altitude, and landmark computations
//!
//! Truncated trigonometric series over `chrono` timestamps. Phase instants
//! are good to a few minutes and positions to a fraction of a degree, which
//! is ample for an illumination percentage and a qualitative phase label.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

/// Geographic observer used for the altitude computation.
#[derive(Debug, Clone, Copy)]
pub struct Observer {
    /// Degrees north
    pub latitude: f64,

    /// Degrees east
    pub longitude: f64,

    /// Metres above sea level; carried with the station config but not
    /// significant at the accuracy of this module.
    pub elevation: f64,
}

/// The four principal phases of the lunation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quarter {
    New,
    FirstQuarter,
    Full,
    LastQuarter,
}

impl Quarter {
    /// Offset into the lunation cycle, in cycles
    fn offset(self) -> f64 {
        match self {
            Quarter::New => 0.0,
            Quarter::FirstQuarter => 0.25,
            Quarter::Full => 0.5,
            Quarter::LastQuarter => 0.75,
        }
    }
}

/// Qualitative phase label with its display icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseLabel {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl PhaseLabel {
    pub fn icon(self) -> &'static str {
        match self {
            PhaseLabel::New => "mdi:moon-new",
            PhaseLabel::WaxingCrescent => "mdi:moon-waxing-crescent",
            PhaseLabel::FirstQuarter => "mdi:moon-first-quarter",
            PhaseLabel::WaxingGibbous => "mdi:moon-waxing-gibbous",
            PhaseLabel::Full => "mdi:moon-full",
            PhaseLabel::WaningGibbous => "mdi:moon-waning-gibbous",
            PhaseLabel::LastQuarter => "mdi:moon-last-quarter",
            PhaseLabel::WaningCrescent => "mdi:moon-waning-crescent",
        }
    }
}

/// One lunar observation for a given observer and instant
#[derive(Debug, Clone, Copy)]
pub struct MoonReport {
    /// Illuminated fraction of the disk, 0–100
    pub phase_percent: f64,

    /// Topocentric altitude in degrees
    pub altitude_deg: f64,

    pub label: PhaseLabel,
}

impl MoonReport {
    /// Rounded phase percentage, or 0 while the moon is at or below the
    /// horizon.
    pub fn illumination_code(&self) -> u8 {
        if self.altitude_deg > 0.0 {
            self.phase_percent.round() as u8
        } else {
            0
        }
    }
}

/// Compute phase, altitude, and label for one observer and instant.
pub fn observe(observer: &Observer, at: DateTime<Utc>, tz: Tz) -> MoonReport {
    MoonReport {
        phase_percent: phase_fraction(at) * 100.0,
        altitude_deg: altitude_degrees(observer, at),
        label: phase_label(at, tz),
    }
}

/// Illuminated fraction of the lunar disk, 0.0–1.0.
pub fn phase_fraction(at: DateTime<Utc>) -> f64 {
    let t = julian_centuries(julian_day(at));
    let moon = moon_ecliptic(t);
    let sun = sun_longitude(t);

    let beta = moon.latitude.to_radians();
    let elongation = (moon.longitude - sun).to_radians();
    let cos_psi = beta.cos() * elongation.cos();
    (1.0 - cos_psi) / 2.0
}

/// Topocentric altitude of the moon in degrees.
pub fn altitude_degrees(observer: &Observer, at: DateTime<Utc>) -> f64 {
    let jd = julian_day(at);
    let t = julian_centuries(jd);
    let moon = moon_ecliptic(t);

    let obliquity = (23.439_291_1 - 0.013_004_2 * t).to_radians();
    let lambda = moon.longitude.to_radians();
    let beta = moon.latitude.to_radians();

    let sin_declination =
        beta.sin() * obliquity.cos() + beta.cos() * obliquity.sin() * lambda.sin();
    let declination = sin_declination.asin();
    let right_ascension = (lambda.sin() * obliquity.cos() - beta.tan() * obliquity.sin())
        .atan2(lambda.cos());

    let gmst = normalize_degrees(
        280.460_618_37 + 360.985_647_366_29 * (jd - 2_451_545.0) + 0.000_387_933 * t * t,
    );
    let local_sidereal = (gmst + observer.longitude).to_radians();
    let hour_angle = local_sidereal - right_ascension;

    let phi = observer.latitude.to_radians();
    (phi.sin() * declination.sin() + phi.cos() * declination.cos() * hour_angle.cos())
        .asin()
        .to_degrees()
}

/// First instant of the given phase strictly after `at`.
pub fn next_phase(at: DateTime<Utc>, quarter: Quarter) -> DateTime<Utc> {
    let mut cycle = approx_cycles(at).floor() as i64 - 2;
    loop {
        let instant = phase_instant(cycle, quarter);
        if instant > at {
            return instant;
        }
        cycle += 1;
    }
}

/// Last instant of the given phase strictly before `at`.
pub fn previous_phase(at: DateTime<Utc>, quarter: Quarter) -> DateTime<Utc> {
    let mut cycle = approx_cycles(at).floor() as i64 + 2;
    loop {
        let instant = phase_instant(cycle, quarter);
        if instant < at {
            return instant;
        }
        cycle -= 1;
    }
}

/// Qualitative phase label for an instant, using local landmark dates.
///
/// An exact local-date match on any of the eight surrounding landmarks wins
/// (full and new before the quarters); otherwise the earliest upcoming
/// landmark places the instant within the cycle.
pub fn phase_label(at: DateTime<Utc>, tz: Tz) -> PhaseLabel {
    let local_date = at.with_timezone(&tz).date_naive();
    let local = |instant: DateTime<Utc>| instant.with_timezone(&tz).date_naive();

    let next_new = next_phase(at, Quarter::New);
    let next_first = next_phase(at, Quarter::FirstQuarter);
    let next_full = next_phase(at, Quarter::Full);
    let next_last = next_phase(at, Quarter::LastQuarter);

    if local_date == local(next_full) || local_date == local(previous_phase(at, Quarter::Full)) {
        return PhaseLabel::Full;
    }
    if local_date == local(next_new) || local_date == local(previous_phase(at, Quarter::New)) {
        return PhaseLabel::New;
    }
    if local_date == local(next_first)
        || local_date == local(previous_phase(at, Quarter::FirstQuarter))
    {
        return PhaseLabel::FirstQuarter;
    }
    if local_date == local(next_last)
        || local_date == local(previous_phase(at, Quarter::LastQuarter))
    {
        return PhaseLabel::LastQuarter;
    }

    let mut upcoming = [
        (next_first, PhaseLabel::WaxingCrescent),
        (next_full, PhaseLabel::WaxingGibbous),
        (next_last, PhaseLabel::WaningGibbous),
        (next_new, PhaseLabel::WaningCrescent),
    ];
    upcoming.sort_by_key(|&(instant, _)| instant);
    upcoming[0].1
}

struct Ecliptic {
    /// Degrees
    longitude: f64,
    /// Degrees
    latitude: f64,
}

fn julian_day(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 / 86_400.0 + 2_440_587.5
}

fn julian_centuries(jd: f64) -> f64 {
    (jd - 2_451_545.0) / 36_525.0
}

fn normalize_degrees(value: f64) -> f64 {
    value.rem_euclid(360.0)
}

/// Mean lunation count since the January 2000 new moon, fractional.
fn approx_cycles(at: DateTime<Utc>) -> f64 {
    let date = at.date_naive();
    let year = f64::from(date.year()) + f64::from(date.ordinal0()) / 365.25;
    (year - 2000.0) * 12.3685
}

/// Geocentric ecliptic position of the moon, principal series terms only.
fn moon_ecliptic(t: f64) -> Ecliptic {
    let lp = 218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t * t;
    let d = (297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t * t).to_radians();
    let m = (357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t * t).to_radians();
    let mp = (134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t * t).to_radians();
    let f = (93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t * t).to_radians();

    let longitude = lp
        + 6.288_774 * mp.sin()
        + 1.274_027 * (2.0 * d - mp).sin()
        + 0.658_314 * (2.0 * d).sin()
        + 0.213_618 * (2.0 * mp).sin()
        - 0.185_116 * m.sin()
        - 0.114_332 * (2.0 * f).sin()
        + 0.058_793 * (2.0 * d - 2.0 * mp).sin()
        + 0.057_066 * (2.0 * d - m - mp).sin()
        + 0.053_322 * (2.0 * d + mp).sin()
        + 0.045_758 * (2.0 * d - m).sin()
        - 0.040_923 * (m - mp).sin()
        - 0.034_720 * d.sin()
        - 0.030_383 * (m + mp).sin();

    let latitude = 5.128_122 * f.sin()
        + 0.280_602 * (mp + f).sin()
        + 0.277_693 * (mp - f).sin()
        + 0.173_237 * (2.0 * d - f).sin()
        + 0.055_413 * (2.0 * d - mp + f).sin()
        + 0.046_271 * (2.0 * d - mp - f).sin()
        + 0.032_573 * (2.0 * d + f).sin()
        + 0.017_198 * (2.0 * mp + f).sin();

    Ecliptic {
        longitude: normalize_degrees(longitude),
        latitude,
    }
}

/// Geocentric true longitude of the sun in degrees.
fn sun_longitude(t: f64) -> f64 {
    let l0 = 280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t;
    let m = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).to_radians();

    let center = (1.914_602 - 0.004_817 * t) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();

    normalize_degrees(l0 + center)
}

/// Instant of one principal phase in lunation `cycle`.
fn phase_instant(cycle: i64, quarter: Quarter) -> DateTime<Utc> {
    let k = cycle as f64 + quarter.offset();
    let t = k / 1_236.85;
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    let jde_mean = 2_451_550.097_66 + 29.530_588_861 * k + 0.000_154_37 * t2
        - 0.000_000_150 * t3
        + 0.000_000_000_73 * t4;

    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t2;
    let m = (2.5534 + 29.105_356_70 * k - 0.000_001_4 * t2).to_radians();
    let mp = (201.5643 + 385.816_935_28 * k + 0.010_758_2 * t2 + 0.000_012_38 * t3).to_radians();
    let f = (160.7108 + 390.670_502_84 * k - 0.001_611_8 * t2 - 0.000_002_27 * t3).to_radians();
    let omega = (124.7746 - 1.563_755_88 * k + 0.002_067_2 * t2).to_radians();

    let correction = match quarter {
        Quarter::New => {
            -0.407_20 * mp.sin() + 0.172_41 * e * m.sin() + 0.016_08 * (2.0 * mp).sin()
                + 0.010_39 * (2.0 * f).sin()
                + 0.007_39 * e * (mp - m).sin()
                - 0.005_14 * e * (mp + m).sin()
                + 0.002_08 * e * e * (2.0 * m).sin()
                - 0.001_11 * (mp - 2.0 * f).sin()
                - 0.000_57 * (mp + 2.0 * f).sin()
                + 0.000_56 * e * (2.0 * mp + m).sin()
                - 0.000_42 * (3.0 * mp).sin()
                + 0.000_42 * e * (m + 2.0 * f).sin()
                + 0.000_38 * e * (m - 2.0 * f).sin()
                - 0.000_24 * e * (2.0 * mp - m).sin()
                - 0.000_17 * omega.sin()
        }
        Quarter::Full => {
            -0.406_14 * mp.sin() + 0.173_02 * e * m.sin() + 0.016_14 * (2.0 * mp).sin()
                + 0.010_43 * (2.0 * f).sin()
                + 0.007_34 * e * (mp - m).sin()
                - 0.005_15 * e * (mp + m).sin()
                + 0.002_09 * e * e * (2.0 * m).sin()
                - 0.001_11 * (mp - 2.0 * f).sin()
                - 0.000_57 * (mp + 2.0 * f).sin()
                + 0.000_56 * e * (2.0 * mp + m).sin()
                - 0.000_42 * (3.0 * mp).sin()
                + 0.000_42 * e * (m + 2.0 * f).sin()
                + 0.000_38 * e * (m - 2.0 * f).sin()
                - 0.000_24 * e * (2.0 * mp - m).sin()
                - 0.000_17 * omega.sin()
        }
        Quarter::FirstQuarter | Quarter::LastQuarter => {
            let base = -0.628_01 * mp.sin()
                + 0.171_72 * e * m.sin()
                - 0.011_83 * e * (mp + m).sin()
                + 0.008_62 * (2.0 * mp).sin()
                + 0.008_04 * (2.0 * f).sin()
                + 0.004_54 * e * (mp - m).sin()
                + 0.002_04 * e * e * (2.0 * m).sin()
                - 0.001_80 * (mp - 2.0 * f).sin()
                - 0.000_70 * (mp + 2.0 * f).sin()
                - 0.000_40 * (3.0 * mp).sin()
                - 0.000_34 * e * (2.0 * mp - m).sin()
                + 0.000_32 * e * (m + 2.0 * f).sin()
                + 0.000_32 * e * (m - 2.0 * f).sin()
                - 0.000_17 * omega.sin();

            let w = 0.003_06 - 0.000_38 * e * m.cos() + 0.000_26 * mp.cos()
                - 0.000_02 * (mp - m).cos()
                + 0.000_02 * (mp + m).cos()
                + 0.000_02 * (2.0 * f).cos();

            match quarter {
                Quarter::FirstQuarter => base + w,
                _ => base - w,
            }
        }
    };

    let jde = jde_mean + correction;
    let seconds = ((jde - 2_440_587.5) * 86_400.0).round() as i64;
    DateTime::<Utc>::from_timestamp(seconds, 0).expect("phase instant within datetime range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn berlin() -> Observer {
        Observer {
            latitude: 52.52,
            longitude: 13.405,
            elevation: 34.0,
        }
    }

    #[test]
    fn test_illumination_near_full_moon() {
        // Full moon 2024-01-25 17:54 UTC
        let fraction = phase_fraction(utc(2024, 1, 25, 18, 0));
        assert!(fraction > 0.97, "fraction was {fraction}");
    }

    #[test]
    fn test_illumination_near_new_moon() {
        // New moon 2024-01-11 11:57 UTC
        let fraction = phase_fraction(utc(2024, 1, 11, 12, 0));
        assert!(fraction < 0.03, "fraction was {fraction}");
    }

    #[test]
    fn test_illumination_at_first_quarter() {
        // First quarter 2024-01-18 03:53 UTC
        let fraction = phase_fraction(utc(2024, 1, 18, 3, 53));
        assert!((0.40..=0.60).contains(&fraction), "fraction was {fraction}");
    }

    #[test]
    fn test_next_full_moon_date() {
        let next = next_phase(utc(2024, 1, 12, 0, 0), Quarter::Full);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 25).unwrap();
        let diff = (next.date_naive() - expected).num_days().abs();
        assert!(diff <= 1, "next full was {next}");
    }

    #[test]
    fn test_phase_search_brackets_instant() {
        let at = utc(2024, 3, 15, 12, 0);
        for quarter in [
            Quarter::New,
            Quarter::FirstQuarter,
            Quarter::Full,
            Quarter::LastQuarter,
        ] {
            let previous = previous_phase(at, quarter);
            let next = next_phase(at, quarter);
            assert!(previous < at && at < next);

            let cycle_days = (next - previous).num_days();
            assert!((28..=31).contains(&cycle_days), "cycle was {cycle_days}d");
        }
    }

    #[test]
    fn test_phase_labels_through_january_2024() {
        let tz = chrono_tz::UTC;
        assert_eq!(phase_label(utc(2024, 1, 14, 12, 0), tz), PhaseLabel::WaxingCrescent);
        assert_eq!(phase_label(utc(2024, 1, 21, 12, 0), tz), PhaseLabel::WaxingGibbous);
        assert_eq!(phase_label(utc(2024, 1, 28, 12, 0), tz), PhaseLabel::WaningGibbous);
        assert_eq!(phase_label(utc(2024, 2, 5, 12, 0), tz), PhaseLabel::WaningCrescent);
    }

    #[test]
    fn test_phase_label_on_landmark_dates() {
        let tz = chrono_tz::UTC;
        assert_eq!(phase_label(utc(2024, 1, 25, 12, 0), tz), PhaseLabel::Full);
        assert_eq!(phase_label(utc(2024, 1, 11, 6, 0), tz), PhaseLabel::New);
    }

    #[test]
    fn test_moon_rises_and_sets_daily() {
        let observer = berlin();
        let mut above = 0;
        let mut below = 0;
        for hour in 0..24 {
            let altitude = altitude_degrees(&observer, utc(2024, 1, 25, hour, 0));
            assert!((-90.0..=90.0).contains(&altitude));
            if altitude > 0.0 {
                above += 1;
            } else {
                below += 1;
            }
        }
        assert!(above > 0 && below > 0);
    }

    #[test]
    fn test_illumination_code_zeroes_below_horizon() {
        let up = MoonReport {
            phase_percent: 87.6,
            altitude_deg: 12.0,
            label: PhaseLabel::WaxingGibbous,
        };
        assert_eq!(up.illumination_code(), 88);

        let down = MoonReport {
            phase_percent: 87.6,
            altitude_deg: -5.0,
            label: PhaseLabel::WaxingGibbous,
        };
        assert_eq!(down.illumination_code(), 0);
    }
}
