// Callout announcer
// Turns location updates into spoken callouts for nearby places

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::places::{Place, PlaceSource};
use crate::audio::SpatialPlayer;
use crate::queue::QueueItem;
use crate::spatial::{ListenerState, LocationSubscription, SubscriptionHandle};

/// When a place qualifies for a callout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalloutPolicy {
    pub proximity_threshold_m: f64,
    /// Minimum time before the same place is announced again.
    /// `None` announces each place once until the announcer is reset.
    pub cooldown: Option<Duration>,
    pub include_distance: bool,
}

impl Default for CalloutPolicy {
    fn default() -> Self {
        Self {
            proximity_threshold_m: 100.0,
            cooldown: None,
            include_distance: true,
        }
    }
}

#[derive(Default)]
struct AnnouncerState {
    announced: HashMap<String, DateTime<Utc>>,
    suspended: bool,
}

pub struct CalloutAnnouncer {
    player: SpatialPlayer,
    places: Arc<dyn PlaceSource>,
    policy: CalloutPolicy,
    state: Mutex<AnnouncerState>,
}

impl CalloutAnnouncer {
    pub fn new(player: SpatialPlayer, places: Arc<dyn PlaceSource>, policy: CalloutPolicy) -> Self {
        Self {
            player,
            places,
            policy,
            state: Mutex::new(AnnouncerState::default()),
        }
    }

    pub fn policy(&self) -> &CalloutPolicy {
        &self.policy
    }

    /// Queue callouts for every candidate in range that is not cooling down.
    ///
    /// Nearest places go first; equal distances keep input order.
    /// Returns the number of callouts queued; none while suspended.
    pub fn on_location_changed(&self, listener: &ListenerState, candidates: &[Place]) -> usize {
        // Held until every callout is queued, so a suspend can't interleave
        let mut state = self.state.lock();
        if state.suspended {
            return 0;
        }

        let mut in_range: Vec<(f64, &Place)> = candidates
            .iter()
            .map(|place| (listener.position.distance_m(&place.location), place))
            .filter(|(meters, _)| *meters <= self.policy.proximity_threshold_m)
            .collect();
        in_range.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut queued = 0;
        for (meters, place) in in_range {
            if let Some(last) = state.announced.get(&place.id) {
                let cooled_down = self
                    .policy
                    .cooldown
                    .is_some_and(|cooldown| listener.updated_at - *last >= cooldown);
                if !cooled_down {
                    continue;
                }
            }

            tracing::debug!("Calling out {} at {:.0} m", place.name, meters);
            state.announced.insert(place.id.clone(), listener.updated_at);
            self.player.enqueue(QueueItem::callout(
                place.name.clone(),
                place.location,
                self.policy.include_distance,
            ));
            queued += 1;
        }
        queued
    }

    /// Forget which places were announced and resume announcing
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.announced.clear();
        state.suspended = false;
    }

    /// Stop queueing callouts until the next `reset`.
    /// Once this returns, no callout from an earlier update can be queued.
    pub fn suspend(&self) {
        self.state.lock().suspended = true;
    }

    /// Fetch candidates for a reading and announce them
    pub async fn announce(&self, listener: &ListenerState) -> usize {
        match self
            .places
            .places_near(listener.position, self.policy.proximity_threshold_m)
            .await
        {
            Ok(candidates) => self.on_location_changed(listener, &candidates),
            Err(e) => {
                tracing::warn!("Failed to look up places near {}: {}", listener.position, e);
                0
            }
        }
    }

    /// Announce on every update the subscription delivers
    pub fn spawn(self: Arc<Self>, mut updates: LocationSubscription) -> SubscriptionHandle {
        let task = tokio::spawn(async move {
            while let Some(listener) = updates.next().await {
                self.announce(&listener).await;
            }
        });
        SubscriptionHandle::new(task)
    }
}
