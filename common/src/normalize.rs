use serde_json::Value;

use crate::model::{Normalized, SensorData};
use crate::snapshot::{self, DecodeError, RawSnapshot};

/// Reshapes a snapshot into per-sensor histories, oldest reading first.
///
/// Readings with equal timestamps keep their reading-key order. Sensors
/// without readings are left out.
pub fn normalize(snapshot: &RawSnapshot) -> Normalized {
    snapshot
        .iter()
        .filter_map(|(sensor_id, readings)| {
            let history = readings.values().cloned().collect::<Vec<_>>();
            SensorData::from_history(sensor_id.as_str(), history).map(|data| (sensor_id.clone(), data))
        })
        .collect()
}

/// Decodes and normalizes a raw JSON snapshot in one step.
pub fn normalize_value(value: &Value) -> Result<Normalized, DecodeError> {
    Ok(normalize(&snapshot::decode(value)?))
}
