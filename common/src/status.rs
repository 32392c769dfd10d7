use serde::{Deserialize, Serialize};

pub const LOW_THRESHOLD: f64 = 30.0; // percent
pub const CRITICAL_THRESHOLD: f64 = 10.0; // percent

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoistureStatus {
    Optimal,
    Low,
    CriticallyDry,
}

impl MoistureStatus {
    pub fn from_moisture(moisture_percent: f64) -> Self {
        if moisture_percent < CRITICAL_THRESHOLD {
            Self::CriticallyDry
        } else if moisture_percent < LOW_THRESHOLD {
            Self::Low
        } else {
            Self::Optimal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Optimal => "Optimal",
            Self::Low => "Low",
            Self::CriticallyDry => "Critically Dry",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Optimal => "#22c55e",
            Self::Low => "#f59e0b",
            Self::CriticallyDry => "#ef4444",
        }
    }
}

/// Gauge reading, clamped into 0..=100.
pub fn gauge_value(moisture_percent: f64) -> f64 {
    moisture_percent.clamp(0.0, 100.0)
}

/// `soil_sensor_1` -> `Soil Sensor_1`. Only the first underscore is a word
/// break.
pub fn display_name(sensor_id: &str) -> String {
    sensor_id
        .replacen('_', " ", 1)
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
