//! Core data types for historic weather samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::AttributeKey;
use crate::classify::ConditionCodes;

/// One raw entry from a scraped history file.
///
/// Stored positionally in the source document as
/// `[temperature, humidity, windspeed, pressure, condition]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricRecord {
    /// Temperature in °C
    pub temperature: f64,

    /// Relative humidity in %
    pub humidity: f64,

    /// Wind speed in km/h
    pub windspeed: f64,

    /// Air pressure in mbar
    pub pressure: f64,

    /// Free-text condition description
    pub condition: String,
}

/// A fully resolved sample: the five raw fields plus the derived codes.
///
/// `PartialEq` is the change-detection contract: a recomputed sample only
/// replaces the cached one when the two differ structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSample {
    pub temperature: f64,
    pub humidity: f64,
    pub windspeed: f64,
    pub pressure: f64,
    pub condition: String,

    /// Rain intensity code
    pub rain: u8,

    /// Sky cloudiness code
    pub sky: u8,

    /// Moon illumination percentage, 0 while below the horizon
    pub moon: u8,
}

impl ResolvedSample {
    /// Assemble a sample from a raw record plus the derived codes.
    pub fn from_record(record: &HistoricRecord, codes: ConditionCodes, moon: u8) -> Self {
        Self {
            temperature: record.temperature,
            humidity: record.humidity,
            windspeed: record.windspeed,
            pressure: record.pressure,
            condition: record.condition.clone(),
            rain: codes.rain,
            sky: codes.sky,
            moon,
        }
    }

    /// Read one attribute as a tagged value.
    pub fn get(&self, key: AttributeKey) -> SampleValue {
        match key {
            AttributeKey::Temperature => SampleValue::Float(self.temperature),
            AttributeKey::Humidity => SampleValue::Float(self.humidity),
            AttributeKey::Windspeed => SampleValue::Float(self.windspeed),
            AttributeKey::Pressure => SampleValue::Float(self.pressure),
            AttributeKey::Condition => SampleValue::Text(self.condition.clone()),
            AttributeKey::Rain => SampleValue::Code(self.rain),
            AttributeKey::Sky => SampleValue::Code(self.sky),
            AttributeKey::Moon => SampleValue::Code(self.moon),
        }
    }
}

/// A single attribute value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SampleValue {
    Float(f64),
    Code(u8),
    Text(String),
}

impl SampleValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Float(v) => Some(*v),
            SampleValue::Code(v) => Some(f64::from(*v)),
            SampleValue::Text(_) => None,
        }
    }

    pub fn as_code(&self) -> Option<u8> {
        match self {
            SampleValue::Code(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SampleValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A changed sample plus its provenance, as emitted to sinks and served
/// over the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEnvelope {
    /// Configured location name of the sensor group
    pub location: String,

    /// Day offset into the past
    pub offset_days: u32,

    /// Additional hour offset
    pub offset_hours: u32,

    /// Timestamp key of the matched record in the source file
    pub record_timestamp: String,

    /// Whole-minute tick the sample was resolved at
    pub resolved_at: DateTime<Utc>,

    pub sample: ResolvedSample,
}
