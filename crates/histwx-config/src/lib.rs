use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StationConfig {
    /// IANA timezone name the history timestamps are local to
    pub timezone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
}

/// One configured sensor group: a history file resolved at a fixed offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorGroupConfig {
    pub location: String,
    pub filename: String,
    pub offset_days: u32,
    #[serde(default)]
    pub offset_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonSection {
    pub scan_interval_secs: Option<u64>,
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub station: Option<StationConfig>,
    #[serde(default, rename = "sensor")]
    pub sensors: Vec<SensorGroupConfig>,
    pub daemon: Option<DaemonSection>,
    pub server: Option<ServerSection>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

impl AppConfig {
    /// Load configuration from HISTWX_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HISTWX_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = if Path::new(&path).exists() {
            let s = fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<AppConfig>(s)?)
    }

    /// Station timezone (default UTC)
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        let name = self
            .station
            .as_ref()
            .and_then(|s| s.timezone.clone())
            .unwrap_or_else(|| "UTC".to_string());
        Tz::from_str(&name).map_err(|_| ConfigError::UnknownTimezone(name))
    }

    pub fn latitude(&self) -> f64 {
        self.station.as_ref().and_then(|s| s.latitude).unwrap_or(0.0)
    }

    pub fn longitude(&self) -> f64 {
        self.station.as_ref().and_then(|s| s.longitude).unwrap_or(0.0)
    }

    pub fn elevation(&self) -> f64 {
        self.station.as_ref().and_then(|s| s.elevation).unwrap_or(0.0)
    }

    /// Poll cadence in seconds (default 120)
    pub fn scan_interval_secs(&self) -> u64 {
        self.daemon
            .as_ref()
            .and_then(|d| d.scan_interval_secs)
            .unwrap_or(120)
    }

    /// Directory for the JSONL sample sink, if configured
    pub fn data_dir(&self) -> Option<String> {
        self.daemon.as_ref().and_then(|d| d.data_dir.clone())
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[station]
timezone = "Europe/Berlin"
latitude = 52.52
longitude = 13.405
elevation = 34.0

[[sensor]]
location = "berlin"
filename = "/var/lib/histwx/berlin.json"
offset_days = 365

[[sensor]]
location = "berlin"
filename = "/var/lib/histwx/berlin.json"
offset_days = 365
offset_hours = 6

[daemon]
scan_interval_secs = 120
data_dir = "./data"

[server]
bind = "127.0.0.1:9090"
"#;

    #[test]
    fn parses_full_example() {
        let cfg = AppConfig::parse(EXAMPLE).unwrap();
        assert_eq!(cfg.sensors.len(), 2);
        assert_eq!(cfg.sensors[0].offset_hours, 0);
        assert_eq!(cfg.sensors[1].offset_hours, 6);
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(cfg.http_bind(), "127.0.0.1:9090");
        assert_eq!(cfg.data_dir().as_deref(), Some("./data"));
    }

    #[test]
    fn default_bind_is_8080() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
    }

    #[test]
    fn default_timezone_is_utc() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::UTC);
        assert_eq!(cfg.scan_interval_secs(), 120);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let cfg = AppConfig::parse("[station]\ntimezone = \"Mars/Olympus\"\n").unwrap();
        assert!(matches!(
            cfg.timezone(),
            Err(ConfigError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn missing_required_sensor_field_is_an_error() {
        let result = AppConfig::parse("[[sensor]]\nlocation = \"berlin\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
