// Location sources: where readings come from
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::location::{LocationProvider, LocationReading, SubscriptionHandle};
use crate::error::LocationError;

/// Device capability that produces location readings
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// A single reading
    async fn current_position(&self) -> Result<LocationReading, LocationError>;

    /// Continuously push readings into `provider` until the handle is cancelled
    fn watch_position(&self, provider: LocationProvider) -> Result<SubscriptionHandle, LocationError>;
}

/// Replays a recorded list of readings.
///
/// The one-shot reading is the first entry; a watch pushes one entry per
/// interval and then stops.
pub struct ReplayLocationSource {
    readings: Vec<LocationReading>,
    interval: Duration,
}

impl ReplayLocationSource {
    pub fn new(readings: Vec<LocationReading>, interval: Duration) -> Self {
        Self { readings, interval }
    }

    /// Load a JSON array of `{latitude, longitude, heading?}` readings
    pub fn from_file(path: &Path, interval: Duration) -> Result<Self, LocationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocationError::Source(format!("{}: {}", path.display(), e)))?;
        let readings: Vec<LocationReading> = serde_json::from_str(&content)
            .map_err(|e| LocationError::Source(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(readings, interval))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// How long a full watch takes to replay
    pub fn duration(&self) -> Duration {
        self.interval * self.readings.len() as u32
    }
}

#[async_trait]
impl LocationSource for ReplayLocationSource {
    async fn current_position(&self) -> Result<LocationReading, LocationError> {
        self.readings
            .first()
            .copied()
            .ok_or_else(|| LocationError::Unavailable("no recorded readings".to_string()))
    }

    fn watch_position(&self, provider: LocationProvider) -> Result<SubscriptionHandle, LocationError> {
        if self.readings.is_empty() {
            return Err(LocationError::Unavailable("no recorded readings".to_string()));
        }

        let readings = self.readings.clone();
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for reading in readings {
                ticker.tick().await;
                if let Err(e) = provider.apply(reading) {
                    tracing::warn!("Skipping recorded reading: {}", e);
                }
            }
        });

        Ok(SubscriptionHandle::new(task))
    }
}
