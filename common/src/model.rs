use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Normalized dashboard data, keyed and ordered by sensor id.
pub type Normalized = BTreeMap<String, SensorData>;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("invalid timestamp: {0:?}")]
pub struct InvalidTimestamp(pub String);

// naive forms are read as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses the ISO-8601 flavours the sensor nodes are known to send.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, InvalidTimestamp> {
    let s = s.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts.and_utc());
        }
    }
    if let Some(ts) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ts.and_utc());
    }

    Err(InvalidTimestamp(s.to_owned()))
}

/// Wire form of a single reading as stored by the sensor nodes.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLog {
    moisture_percent: f64,
    raw_adc: u32,
    timestamp: String,
}

/// One moisture reading. Immutable once built, so the parsed instant always
/// matches the timestamp string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorLog {
    moisture_percent: f64, // percent
    raw_adc: u32,
    timestamp: String, // as received
    #[serde(skip_serializing)]
    recorded_at: DateTime<Utc>,
}

impl SensorLog {
    pub fn new(
        moisture_percent: f64,
        raw_adc: u32,
        timestamp: impl Into<String>,
    ) -> Result<Self, InvalidTimestamp> {
        let timestamp = timestamp.into();
        let recorded_at = parse_timestamp(&timestamp)?;

        Ok(Self {
            moisture_percent,
            raw_adc,
            timestamp,
            recorded_at,
        })
    }

    pub(crate) fn from_raw(raw: RawLog) -> Result<Self, InvalidTimestamp> {
        Self::new(raw.moisture_percent, raw.raw_adc, raw.timestamp)
    }

    pub fn moisture_percent(&self) -> f64 {
        self.moisture_percent
    }

    pub fn raw_adc(&self) -> u32 {
        self.raw_adc
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl<'de> Deserialize<'de> for SensorLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::from_raw(RawLog::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum InvalidSensorData {
    #[error("sensor {0} has an empty history")]
    EmptyHistory(String),
    #[error("sensor {0}: latest reading is not the last history entry")]
    LatestMismatch(String),
}

#[derive(Deserialize)]
struct SensorDataRepr {
    sensor_id: String,
    latest: SensorLog,
    history: Vec<SensorLog>,
}

/// All readings of one sensor, oldest first.
///
/// `history` is never empty and `latest` is always its last entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorData {
    sensor_id: String,
    latest: SensorLog,
    history: Vec<SensorLog>,
}

impl SensorData {
    /// Sorts `history` ascending by timestamp, keeping the given order for
    /// equal instants. Returns `None` for an empty history.
    pub fn from_history(sensor_id: impl Into<String>, mut history: Vec<SensorLog>) -> Option<Self> {
        history.sort_by_key(SensorLog::recorded_at);
        let latest = history.last()?.clone();

        Some(Self {
            sensor_id: sensor_id.into(),
            latest,
            history,
        })
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn latest(&self) -> &SensorLog {
        &self.latest
    }

    pub fn history(&self) -> &[SensorLog] {
        &self.history
    }

    fn from_repr(repr: SensorDataRepr) -> Result<Self, InvalidSensorData> {
        let data = Self::from_history(repr.sensor_id.clone(), repr.history)
            .ok_or_else(|| InvalidSensorData::EmptyHistory(repr.sensor_id.clone()))?;
        if data.latest != repr.latest {
            return Err(InvalidSensorData::LatestMismatch(repr.sensor_id));
        }
        Ok(data)
    }
}

impl<'de> Deserialize<'de> for SensorData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::from_repr(SensorDataRepr::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}
