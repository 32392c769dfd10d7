use std::sync::{Arc, Mutex};

use common::{
    normalize_value,
    req::{DashboardResponse, SensorDetail},
    Normalized,
};
use log::{error, info, warn};

use crate::feed::{FeedEvent, SnapshotSource, Subscription};

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Failed to process sensor data.")]
    Processing,
    #[error("Cannot connect to the sensor feed. Check configuration.")]
    Connection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Loading,
    Ready(Normalized),
    Failed(DashboardError),
}

/// Latest normalized view of the feed.
#[derive(Debug)]
pub struct Dashboard {
    state: DashboardState,
}

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            state: DashboardState::Loading,
        }
    }

    pub fn shared() -> SharedDashboard {
        Arc::new(Mutex::new(Self::new()))
    }

    #[cfg(test)]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Each snapshot replaces the whole state. A snapshot that fails to
    /// decode leaves no partial data behind.
    pub fn apply(&mut self, event: FeedEvent) {
        self.state = match event {
            FeedEvent::Snapshot(value) => match normalize_value(&value) {
                Ok(sensors) => {
                    info!("Snapshot with {} sensor(s)", sensors.len());
                    DashboardState::Ready(sensors)
                }
                Err(e) => {
                    warn!("Discarding snapshot: {e}");
                    DashboardState::Failed(DashboardError::Processing)
                }
            },
            FeedEvent::ConnectionLost(reason) => {
                error!("Sensor feed unavailable: {reason}");
                DashboardState::Failed(DashboardError::Connection)
            }
        };
    }

    /// Feeds `source` into `dashboard` until the subscription is dropped.
    pub fn attach(dashboard: &SharedDashboard, source: &dyn SnapshotSource) -> Subscription {
        let dashboard = Arc::clone(dashboard);
        source.subscribe(Box::new(move |event: FeedEvent| {
            if let Ok(mut dashboard) = dashboard.lock() {
                dashboard.apply(event);
            }
        }))
    }

    pub fn response(&self) -> DashboardResponse {
        match &self.state {
            DashboardState::Loading => DashboardResponse::loading(),
            DashboardState::Ready(sensors) => DashboardResponse::ready(sensors),
            DashboardState::Failed(e) => DashboardResponse::failed(e.to_string()),
        }
    }

    /// `Err` while no usable data is available.
    pub fn sensors(&self) -> Result<&Normalized, Option<DashboardError>> {
        match &self.state {
            DashboardState::Loading => Err(None),
            DashboardState::Ready(sensors) => Ok(sensors),
            DashboardState::Failed(e) => Err(Some(*e)),
        }
    }

    pub fn detail(&self, sensor_id: &str) -> Result<Option<SensorDetail>, Option<DashboardError>> {
        Ok(self.sensors()?.get(sensor_id).map(SensorDetail::from))
    }
}
