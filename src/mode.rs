// Operating modes
// At most one mode is active; requesting the active mode again turns it off
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::audio::SpatialPlayer;
use crate::callout::CalloutAnnouncer;
use crate::error::LocationError;
use crate::queue::QueueItem;
use crate::spatial::{LocationProvider, LocationReading, LocationSource, SubscriptionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    #[default]
    None,
    /// Follow the listener and call out places as they come into range
    TrackingWithCallouts,
    /// One location fix, one pass of callouts
    AnnouncePlacesNearMe,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatingMode::None => "none",
            OperatingMode::TrackingWithCallouts => "callouts",
            OperatingMode::AnnouncePlacesNearMe => "near_me",
        };
        f.write_str(name)
    }
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(OperatingMode::None),
            "callouts" | "tracking" => Ok(OperatingMode::TrackingWithCallouts),
            "near_me" | "nearme" => Ok(OperatingMode::AnnouncePlacesNearMe),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Sounds played around mode changes
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSounds {
    pub enter: String,
    pub exit: String,
}

#[derive(Default)]
struct ModeState {
    mode: OperatingMode,
    watch: Option<SubscriptionHandle>,
    callouts: Option<SubscriptionHandle>,
}

impl ModeState {
    fn stop_tracking(&mut self) {
        if let Some(handle) = self.watch.take() {
            handle.cancel();
        }
        if let Some(handle) = self.callouts.take() {
            handle.cancel();
        }
    }
}

pub struct ModeController {
    player: SpatialPlayer,
    provider: LocationProvider,
    source: Arc<dyn LocationSource>,
    announcer: Arc<CalloutAnnouncer>,
    sounds: ModeSounds,
    override_reading: Option<LocationReading>,
    // Held across location acquisition so transitions never interleave
    state: Mutex<ModeState>,
}

impl ModeController {
    pub fn new(
        player: SpatialPlayer,
        provider: LocationProvider,
        source: Arc<dyn LocationSource>,
        announcer: Arc<CalloutAnnouncer>,
        sounds: ModeSounds,
    ) -> Self {
        Self {
            player,
            provider,
            source,
            announcer,
            sounds,
            override_reading: None,
            state: Mutex::new(ModeState::default()),
        }
    }

    /// Use a fixed reading instead of the location source for near-me passes
    pub fn with_override(mut self, reading: Option<LocationReading>) -> Self {
        self.override_reading = reading;
        self
    }

    pub async fn mode(&self) -> OperatingMode {
        self.state.lock().await.mode
    }

    /// Switch modes.
    ///
    /// Leaving an active mode clears the player and plays the exit sound.
    /// Requesting the current mode, or `None`, leaves everything off.
    /// A mode is only entered once a valid location is in hand; on a location
    /// failure the controller stays in `None` and the error is returned.
    pub async fn toggle(&self, requested: OperatingMode) -> Result<OperatingMode, LocationError> {
        let mut state = self.state.lock().await;
        let current = state.mode;

        if current != OperatingMode::None {
            tracing::info!("Leaving mode {}", current);
            // Silence the announcer first so no callout lands after the exit cue
            self.announcer.suspend();
            state.stop_tracking();
            self.player.stop_and_clear();
            self.player.enqueue(QueueItem::sound(self.sounds.exit.as_str()));
            state.mode = OperatingMode::None;
        }

        if requested == current || requested == OperatingMode::None {
            return Ok(OperatingMode::None);
        }

        match requested {
            OperatingMode::TrackingWithCallouts => {
                // Subscribe before the source starts so its first reading is seen
                let updates = self.provider.subscribe();
                let watch = self.source.watch_position(self.provider.clone()).map_err(|e| {
                    tracing::warn!("Could not start location tracking: {}", e);
                    e
                })?;

                self.enter(&mut state, requested);
                state.watch = Some(watch);
                state.callouts = Some(Arc::clone(&self.announcer).spawn(updates));
            }
            OperatingMode::AnnouncePlacesNearMe => {
                let reading = match self.override_reading {
                    Some(reading) => reading,
                    None => self.source.current_position().await.map_err(|e| {
                        tracing::warn!("Could not get a location for places near me: {}", e);
                        e
                    })?,
                };
                reading.validate()?;

                self.enter(&mut state, requested);
                let listener = self.provider.apply(reading)?;
                let queued = self.announcer.announce(&listener).await;
                tracing::info!("Announcing {} places near {}", queued, listener.position);
            }
            OperatingMode::None => {}
        }

        Ok(state.mode)
    }

    fn enter(&self, state: &mut ModeState, mode: OperatingMode) {
        tracing::info!("Entering mode {}", mode);
        state.mode = mode;
        self.announcer.reset();
        self.player.enqueue(QueueItem::sound(self.sounds.enter.as_str()));
    }

    /// Turn off whatever mode is active
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        self.announcer.suspend();
        state.stop_tracking();
        state.mode = OperatingMode::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::speech::Utterance;
    use crate::audio::{SoundBackend, SpeechBackend, VoiceDescriptor};
    use crate::callout::{CalloutPolicy, Place, StaticPlaces};
    use crate::error::{PlaybackError, SpeechError};
    use crate::spatial::geo::EARTH_RADIUS_M;
    use crate::spatial::{DistanceUnits, GeoPoint, RelativePosition, ReplayLocationSource};
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::time::Duration;

    type Log = Arc<SyncMutex<Vec<String>>>;

    struct LogSound(Log);

    #[async_trait]
    impl SoundBackend for LogSound {
        async fn play(&self, url: &str, _position: RelativePosition) -> Result<(), PlaybackError> {
            self.0.lock().push(url.to_string());
            Ok(())
        }
        fn stop(&self) {}
    }

    struct LogSpeech(Log);

    #[async_trait]
    impl SpeechBackend for LogSpeech {
        async fn speak(&self, utterance: &Utterance, _position: RelativePosition) -> Result<(), SpeechError> {
            self.0.lock().push(utterance.text.clone());
            Ok(())
        }
        fn stop(&self) {}
        async fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError> {
            Ok(vec![])
        }
    }

    fn east(meters: f64) -> GeoPoint {
        GeoPoint::new(0.0, (meters / EARTH_RADIUS_M).to_degrees())
    }

    struct Harness {
        modes: ModeController,
        announcer: Arc<CalloutAnnouncer>,
        player: SpatialPlayer,
        provider: LocationProvider,
        log: Log,
    }

    fn harness(track: Vec<LocationReading>) -> Harness {
        let log: Log = Arc::new(SyncMutex::new(Vec::new()));
        let provider = LocationProvider::new();
        let player = SpatialPlayer::new(
            provider.clone(),
            Arc::new(LogSound(log.clone())),
            Arc::new(LogSpeech(log.clone())),
            DistanceUnits::Meters,
        );
        let places = StaticPlaces::new(vec![
            Place::new("1", "Bakery", east(40.0)),
            Place::new("2", "Stadium", east(3000.0)),
        ]);
        let announcer = Arc::new(CalloutAnnouncer::new(
            player.clone(),
            Arc::new(places),
            CalloutPolicy::default(),
        ));
        let source = ReplayLocationSource::new(track, Duration::from_secs(60));
        let modes = ModeController::new(
            player.clone(),
            provider.clone(),
            Arc::new(source),
            announcer.clone(),
            ModeSounds {
                enter: "enter.wav".to_string(),
                exit: "exit.wav".to_string(),
            },
        );
        Harness {
            modes,
            announcer,
            player,
            provider,
            log,
        }
    }

    fn origin_track() -> Vec<LocationReading> {
        vec![LocationReading::new(0.0, 0.0, Some(0.0))]
    }

    async fn settle(player: &SpatialPlayer) {
        tokio::time::timeout(Duration::from_secs(5), player.wait_until_idle())
            .await
            .unwrap();
    }

    async fn until_logged(log: &Log, prefix: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !log.lock().iter().any(|e| e.starts_with(prefix)) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_parse_mode_names() {
        assert_eq!("callouts".parse::<OperatingMode>().unwrap(), OperatingMode::TrackingWithCallouts);
        assert_eq!("near_me".parse::<OperatingMode>().unwrap(), OperatingMode::AnnouncePlacesNearMe);
        assert!("sideways".parse::<OperatingMode>().is_err());
        assert_eq!(OperatingMode::AnnouncePlacesNearMe.to_string(), "near_me");
    }

    #[tokio::test]
    async fn test_toggle_same_mode_twice_turns_off() {
        let h = harness(origin_track());
        assert_eq!(
            h.modes.toggle(OperatingMode::TrackingWithCallouts).await.unwrap(),
            OperatingMode::TrackingWithCallouts
        );
        settle(&h.player).await;

        assert_eq!(
            h.modes.toggle(OperatingMode::TrackingWithCallouts).await.unwrap(),
            OperatingMode::None
        );
        settle(&h.player).await;
        assert_eq!(h.modes.mode().await, OperatingMode::None);
        assert_eq!(h.log.lock().last().map(String::as_str), Some("exit.wav"));
    }

    #[tokio::test]
    async fn test_switching_plays_one_exit_then_one_enter() {
        let h = harness(origin_track());
        h.modes.toggle(OperatingMode::TrackingWithCallouts).await.unwrap();
        until_logged(&h.log, "Bakery").await;
        settle(&h.player).await;
        let before = h.log.lock().len();

        let mode = h.modes.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap();
        assert_eq!(mode, OperatingMode::AnnouncePlacesNearMe);
        settle(&h.player).await;

        let log = h.log.lock();
        assert_eq!(log[before..], ["exit.wav", "enter.wav", "Bakery, 40 meters"]);
    }

    #[tokio::test]
    async fn test_near_me_without_location_stays_off() {
        let h = harness(vec![]);
        let err = h.modes.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
        assert_eq!(h.modes.mode().await, OperatingMode::None);

        settle(&h.player).await;
        assert!(h.log.lock().is_empty());
        assert!(h.provider.current().is_none());
    }

    #[tokio::test]
    async fn test_tracking_without_source_stays_off() {
        let h = harness(vec![]);
        assert!(h.modes.toggle(OperatingMode::TrackingWithCallouts).await.is_err());
        assert_eq!(h.modes.mode().await, OperatingMode::None);
        assert!(h.log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_near_me_prefers_override() {
        let mut h = harness(vec![LocationReading::new(10.0, 10.0, Some(0.0))]);
        h.modes = h.modes.with_override(Some(LocationReading::new(0.0, 0.0, Some(90.0))));

        h.modes.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap();
        settle(&h.player).await;

        let listener = h.provider.current().unwrap();
        assert_eq!(listener.position, GeoPoint::new(0.0, 0.0));
        assert_eq!(listener.heading, 90.0);
        assert_eq!(*h.log.lock(), vec!["enter.wav", "Bakery, 40 meters"]);
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected() {
        let mut h = harness(origin_track());
        h.modes = h.modes.with_override(Some(LocationReading::new(200.0, 0.0, Some(0.0))));
        let err = h.modes.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap_err();
        assert!(matches!(err, LocationError::InvalidReading { .. }));
        assert_eq!(h.modes.mode().await, OperatingMode::None);
    }

    #[tokio::test]
    async fn test_tracking_announces_from_source() {
        let h = harness(origin_track());
        h.modes.toggle(OperatingMode::TrackingWithCallouts).await.unwrap();
        until_logged(&h.log, "Bakery").await;
        settle(&h.player).await;

        assert_eq!(*h.log.lock(), vec!["enter.wav", "Bakery, 40 meters"]);
    }

    #[tokio::test]
    async fn test_none_request_turns_off() {
        let h = harness(origin_track());
        assert_eq!(h.modes.toggle(OperatingMode::None).await.unwrap(), OperatingMode::None);
        settle(&h.player).await;
        assert!(h.log.lock().is_empty());

        h.modes.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap();
        assert_eq!(h.modes.toggle(OperatingMode::None).await.unwrap(), OperatingMode::None);
        settle(&h.player).await;
        assert_eq!(h.log.lock().last().map(String::as_str), Some("exit.wav"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_callout_after_exit_cue() {
        let h = harness(origin_track());
        h.modes.toggle(OperatingMode::TrackingWithCallouts).await.unwrap();
        until_logged(&h.log, "Bakery").await;

        h.modes.toggle(OperatingMode::TrackingWithCallouts).await.unwrap();

        // A location update racing the teardown finds the announcer silenced
        let listener = h.provider.update(0.0, 0.0, 0.0).unwrap();
        let late = vec![Place::new("3", "Late Cafe", east(10.0))];
        assert_eq!(h.announcer.on_location_changed(&listener, &late), 0);
        settle(&h.player).await;

        assert_eq!(h.log.lock().last().map(String::as_str), Some("exit.wav"));
        assert!(!h.log.lock().iter().any(|e| e.starts_with("Late Cafe")));
    }
}
