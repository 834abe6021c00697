// Listener state and the location update channel
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::geo::{normalize_heading, GeoPoint};
use crate::error::LocationError;

/// Where the listener is and which way they face
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ListenerState {
    pub position: GeoPoint,
    /// Degrees clockwise from north, 0..360
    pub heading: f64,
    pub updated_at: DateTime<Utc>,
}

/// A raw reading from a location source. Heading may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
}

impl LocationReading {
    pub fn new(latitude: f64, longitude: f64, heading: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            heading,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<(), LocationError> {
        let heading_ok = self.heading.map_or(true, f64::is_finite);
        if self.position().is_valid() && heading_ok {
            Ok(())
        } else {
            Err(LocationError::InvalidReading {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Owner of the single shared `ListenerState`.
///
/// Cloning is cheap and every clone publishes to, and reads from, the same
/// record. Readers always see the most recent update.
#[derive(Clone)]
pub struct LocationProvider {
    state: Arc<watch::Sender<Option<ListenerState>>>,
}

impl Default for LocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Push a new reading with a known heading
    pub fn update(&self, latitude: f64, longitude: f64, heading: f64) -> Result<ListenerState, LocationError> {
        self.apply(LocationReading::new(latitude, longitude, Some(heading)))
    }

    /// Push a reading; a missing heading keeps the previous one
    pub fn apply(&self, reading: LocationReading) -> Result<ListenerState, LocationError> {
        reading.validate()?;

        let previous_heading = self.current().map(|s| s.heading).unwrap_or(0.0);
        let listener = ListenerState {
            position: reading.position(),
            heading: normalize_heading(reading.heading.unwrap_or(previous_heading)),
            updated_at: Utc::now(),
        };

        self.state.send_replace(Some(listener));
        tracing::debug!(
            "Listener at {} heading {:.0}",
            listener.position,
            listener.heading
        );
        Ok(listener)
    }

    /// Latest listener state, if any reading has arrived yet
    pub fn current(&self) -> Option<ListenerState> {
        *self.state.borrow()
    }

    /// Receive future updates. Readings published before this call are not replayed.
    pub fn subscribe(&self) -> LocationSubscription {
        LocationSubscription {
            rx: self.state.subscribe(),
        }
    }
}

/// A consumer's view of the location update stream
pub struct LocationSubscription {
    rx: watch::Receiver<Option<ListenerState>>,
}

impl LocationSubscription {
    /// Wait for the next update. Intermediate readings may be skipped when
    /// the consumer is slower than the source; the newest always wins.
    /// Returns `None` once every provider handle is gone.
    pub async fn next(&mut self) -> Option<ListenerState> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(state) = *self.rx.borrow_and_update() {
                return Some(state);
            }
        }
    }
}

/// Cancel handle for a background task fed by, or feeding, location updates.
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
