// response types of the backend API, shared with its clients
use crate::model::{Normalized, SensorData, SensorLog};
use crate::status::{display_name, gauge_value, MoistureStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SensorCard {
    pub sensor_id: String,
    pub name: String,
    pub moisture_percent: f64, // latest reading
    pub gauge_value: f64,      // clamped to 0..=100
    pub status: MoistureStatus,
    pub status_label: String,
    pub status_color: String,
    pub data_points: usize,
    pub last_seen: String, // timestamp of the latest reading
}

impl From<&SensorData> for SensorCard {
    fn from(data: &SensorData) -> Self {
        let latest = data.latest();
        let status = MoistureStatus::from_moisture(latest.moisture_percent());

        Self {
            sensor_id: data.sensor_id().to_owned(),
            name: display_name(data.sensor_id()),
            moisture_percent: latest.moisture_percent(),
            gauge_value: gauge_value(latest.moisture_percent()),
            status,
            status_label: status.label().to_owned(),
            status_color: status.color().to_owned(),
            data_points: data.history().len(),
            last_seen: latest.timestamp().to_owned(),
        }
    }
}

/// Moisture trend, oldest first. Both vectors have the same length.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TrendSeries {
    pub timestamps: Vec<String>,
    pub moisture: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SensorDetail {
    pub sensor_id: String,
    pub name: String,
    pub trend: TrendSeries,
    pub log: Vec<SensorLog>, // newest first
}

impl From<&SensorData> for SensorDetail {
    fn from(data: &SensorData) -> Self {
        let history = data.history();

        Self {
            sensor_id: data.sensor_id().to_owned(),
            name: display_name(data.sensor_id()),
            trend: TrendSeries {
                timestamps: history.iter().map(|l| l.timestamp().to_owned()).collect(),
                moisture: history.iter().map(|l| l.moisture_percent()).collect(),
            },
            log: history.iter().rev().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DashboardResponse {
    pub state: FeedState,
    pub error: Option<String>,
    pub sensors: Vec<SensorCard>, // ordered by sensor id
}

impl DashboardResponse {
    pub fn loading() -> Self {
        Self {
            state: FeedState::Loading,
            error: None,
            sensors: vec![],
        }
    }

    pub fn ready(sensors: &Normalized) -> Self {
        Self {
            state: FeedState::Ready,
            error: None,
            sensors: sensors.values().map(SensorCard::from).collect(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: FeedState::Error,
            error: Some(message.into()),
            sensors: vec![],
        }
    }

    /// Connected, but no sensor has reported yet.
    pub fn is_waiting(&self) -> bool {
        self.state == FeedState::Ready && self.sensors.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::normalize::normalize_value;
    use serde_json::json;

    fn sensors() -> Normalized {
        normalize_value(&json!({
            "zone_b": {
                "1": {"moisture_percent": 7.5, "raw_adc": 3900, "timestamp": "2024-06-01T10:00:00Z"}
            },
            "zone_a": {
                "1": {"moisture_percent": 35.0, "raw_adc": 2100, "timestamp": "2024-06-01T09:00:00Z"},
                "2": {"moisture_percent": 24.0, "raw_adc": 2600, "timestamp": "2024-06-01T10:00:00Z"},
                "0": {"moisture_percent": 41.0, "raw_adc": 1900, "timestamp": "2024-06-01T08:00:00Z"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_cards_sorted_with_status() {
        let resp = DashboardResponse::ready(&sensors());
        assert_eq!(resp.state, FeedState::Ready);
        assert!(!resp.is_waiting());

        let ids = resp.sensors.iter().map(|c| c.sensor_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["zone_a", "zone_b"]);

        let a = &resp.sensors[0];
        assert_eq!(a.name, "Zone A");
        assert_eq!(a.moisture_percent, 24.0);
        assert_eq!(a.status, MoistureStatus::Low);
        assert_eq!(a.status_label, "Low");
        assert_eq!(a.data_points, 3);
        assert_eq!(a.last_seen, "2024-06-01T10:00:00Z");

        assert_eq!(resp.sensors[1].status, MoistureStatus::CriticallyDry);
    }

    #[test]
    fn test_detail_trend_and_log() {
        let sensors = sensors();
        let detail = SensorDetail::from(&sensors["zone_a"]);

        assert_eq!(detail.trend.moisture, vec![41.0, 35.0, 24.0]);
        assert_eq!(
            detail.trend.timestamps,
            vec![
                "2024-06-01T08:00:00Z",
                "2024-06-01T09:00:00Z",
                "2024-06-01T10:00:00Z"
            ]
        );
        let log = detail.log.iter().map(|l| l.raw_adc()).collect::<Vec<_>>();
        assert_eq!(log, vec![2600, 2100, 1900]);
    }

    #[test]
    fn test_waiting_and_failed() {
        assert!(DashboardResponse::ready(&Normalized::new()).is_waiting());
        assert!(!DashboardResponse::loading().is_waiting());

        let resp = DashboardResponse::failed("boom");
        assert_eq!(resp.state, FeedState::Error);
        assert_eq!(resp.error.as_deref(), Some("boom"));
    }
}
