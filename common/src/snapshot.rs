//! Validation of the untyped `sensor_readings` snapshot.
//!
//! The store delivers `{ sensor_id: { reading_key: reading } }` as plain JSON.
//! Decoding fails on the first malformed node and names where it was found.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::model::{InvalidTimestamp, RawLog, SensorLog};

/// Typed snapshot: sensor id -> reading key -> reading.
pub type RawSnapshot = BTreeMap<String, BTreeMap<String, SensorLog>>;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{path}: expected an object, got {found}")]
    NotAnObject { path: String, found: &'static str },
    #[error("{sensor_id}/{reading_key}: {source}")]
    InvalidReading {
        sensor_id: String,
        reading_key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{sensor_id}/{reading_key}: {source}")]
    InvalidTimestamp {
        sensor_id: String,
        reading_key: String,
        #[source]
        source: InvalidTimestamp,
    },
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decodes a snapshot. `null` means the path holds no data and yields an
/// empty snapshot.
pub fn decode(value: &Value) -> Result<RawSnapshot, DecodeError> {
    let sensors = match value {
        Value::Null => return Ok(RawSnapshot::new()),
        Value::Object(sensors) => sensors,
        other => {
            return Err(DecodeError::NotAnObject {
                path: "/".to_owned(),
                found: kind_of(other),
            })
        }
    };

    let mut snapshot = RawSnapshot::new();
    for (sensor_id, readings) in sensors {
        let readings = readings.as_object().ok_or_else(|| DecodeError::NotAnObject {
            path: format!("/{sensor_id}"),
            found: kind_of(readings),
        })?;

        let mut logs = BTreeMap::new();
        for (reading_key, reading) in readings {
            let raw = RawLog::deserialize(reading).map_err(|source| {
                DecodeError::InvalidReading {
                    sensor_id: sensor_id.clone(),
                    reading_key: reading_key.clone(),
                    source,
                }
            })?;
            let log = SensorLog::from_raw(raw).map_err(|source| DecodeError::InvalidTimestamp {
                sensor_id: sensor_id.clone(),
                reading_key: reading_key.clone(),
                source,
            })?;
            logs.insert(reading_key.clone(), log);
        }
        snapshot.insert(sensor_id.clone(), logs);
    }

    Ok(snapshot)
}
