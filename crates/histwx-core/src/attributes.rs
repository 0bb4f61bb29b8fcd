//! Exposed sensor attributes and their metadata

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight attributes each sensor group exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKey {
    Temperature,
    Humidity,
    Windspeed,
    Pressure,
    Condition,
    Rain,
    Sky,
    Moon,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 8] = [
        AttributeKey::Temperature,
        AttributeKey::Humidity,
        AttributeKey::Windspeed,
        AttributeKey::Pressure,
        AttributeKey::Condition,
        AttributeKey::Rain,
        AttributeKey::Sky,
        AttributeKey::Moon,
    ];

    /// Stable key string used in ids and serialized payloads
    pub fn key(self) -> &'static str {
        match self {
            AttributeKey::Temperature => "temperature",
            AttributeKey::Humidity => "humidity",
            AttributeKey::Windspeed => "windspeed",
            AttributeKey::Pressure => "pressure",
            AttributeKey::Condition => "condition",
            AttributeKey::Rain => "rain",
            AttributeKey::Sky => "sky",
            AttributeKey::Moon => "moon",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AttributeKey::Temperature => "Temperature",
            AttributeKey::Humidity => "Humidity",
            AttributeKey::Windspeed => "Windspeed",
            AttributeKey::Pressure => "Air Pressure",
            AttributeKey::Condition => "Condition",
            AttributeKey::Rain => "Rain",
            AttributeKey::Sky => "Sky (cloudiness)",
            AttributeKey::Moon => "Moon illumination",
        }
    }

    /// Unit of measurement, where one applies
    pub fn unit(self) -> Option<&'static str> {
        match self {
            AttributeKey::Temperature => Some("°C"),
            AttributeKey::Humidity => Some("%"),
            AttributeKey::Windspeed => Some("km/h"),
            AttributeKey::Pressure => Some("mbar"),
            AttributeKey::Moon => Some("%"),
            AttributeKey::Condition | AttributeKey::Rain | AttributeKey::Sky => None,
        }
    }

    /// Default display icon. The moon attribute's icon is phase-dependent
    /// at runtime; this is its fallback before the first resolution.
    pub fn icon(self) -> &'static str {
        match self {
            AttributeKey::Temperature => "mdi:thermometer",
            AttributeKey::Humidity => "mdi:water-percent",
            AttributeKey::Windspeed => "mdi:windsock",
            AttributeKey::Pressure => "mdi:weather-cloudy",
            AttributeKey::Condition => "mdi:weather-cloudy",
            AttributeKey::Rain => "mdi:weather-pouring",
            AttributeKey::Sky => "mdi:weather-partly-cloudy",
            AttributeKey::Moon => "mdi:weather-night",
        }
    }

    /// Stable unique id derived from the attribute, location, and day offset
    pub fn unique_id(self, location: &str, offset_days: u32) -> String {
        format!("historic_{}_{}-{}", self.key(), location, offset_days)
    }

    /// Human-readable entity name
    pub fn entity_name(self, location: &str, offset_days: u32) -> String {
        format!("{} in {}, {} days ago", self.key(), location, offset_days)
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown attribute: {0}")]
pub struct UnknownAttribute(String);

impl FromStr for AttributeKey {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeKey::ALL
            .into_iter()
            .find(|key| key.key() == s)
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}
