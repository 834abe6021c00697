// Application state management
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{
    AudioSink, BufferSoundBackend, EspeakSpeech, FileFetcher, SoundBackend, SoundCache, SpatialPlayer,
    SpeechBackend, SymphoniaDecoder,
};
use crate::callout::{CalloutAnnouncer, PlaceSource, StaticPlaces};
use crate::error::{LocationError, SpeechError};
use crate::mode::{ModeController, OperatingMode};
use crate::settings::NavigatorSettings;
use crate::spatial::{ListenerState, LocationProvider, LocationSource, LocationSubscription, ReplayLocationSource};

/// The capabilities the navigator drives
pub struct Backends {
    pub sound: Arc<dyn SoundBackend>,
    pub speech: Arc<dyn SpeechBackend>,
    pub location: Arc<dyn LocationSource>,
    pub places: Arc<dyn PlaceSource>,
}

impl Backends {
    /// Native backends: decoded sound effects into `sink`, the configured
    /// speech program, and the place and track files from settings
    pub fn native(settings: &NavigatorSettings, app_dir: &Path, sink: Arc<dyn AudioSink>) -> Result<Self> {
        let sound_root = NavigatorSettings::resolve(app_dir, &settings.audio.sound_root);
        let cache = Arc::new(SoundCache::new(
            Arc::new(FileFetcher::new(sound_root)),
            Arc::new(SymphoniaDecoder),
        ));
        let sound = BufferSoundBackend::new(cache, sink, settings.audio.panner());

        let places = match &settings.location.places_file {
            Some(path) => {
                let path = NavigatorSettings::resolve(app_dir, path);
                StaticPlaces::from_file(&path).with_context(|| format!("Failed to load places from {:?}", path))?
            }
            None => {
                tracing::warn!("No places file configured, nothing will be called out");
                StaticPlaces::default()
            }
        };

        let interval = settings.location.track_interval();
        let location = match &settings.location.track_file {
            Some(path) => {
                let path = NavigatorSettings::resolve(app_dir, path);
                ReplayLocationSource::from_file(&path, interval)
                    .with_context(|| format!("Failed to load track from {:?}", path))?
            }
            None => ReplayLocationSource::new(Vec::new(), interval),
        };

        Ok(Self {
            sound: Arc::new(sound),
            speech: Arc::new(EspeakSpeech::new(settings.speech.program.as_str())),
            location: Arc::new(location),
            places: Arc::new(places),
        })
    }
}

/// Everything wired together: one listener state, one player, one announcer
/// and the mode controller on top
pub struct Navigator {
    pub provider: LocationProvider,
    pub player: SpatialPlayer,
    pub announcer: Arc<CalloutAnnouncer>,
    pub modes: ModeController,
    pub app_dir: PathBuf,
}

impl Navigator {
    /// Must be called from within a Tokio runtime
    pub fn new(settings: &NavigatorSettings, backends: Backends, app_dir: PathBuf) -> Self {
        let provider = LocationProvider::new();
        let player = SpatialPlayer::new(
            provider.clone(),
            backends.sound,
            backends.speech,
            settings.callouts.distance_units,
        );
        player.set_rate(settings.speech.rate);

        let announcer = Arc::new(CalloutAnnouncer::new(
            player.clone(),
            backends.places,
            settings.callouts.policy(),
        ));
        let modes = ModeController::new(
            player.clone(),
            provider.clone(),
            backends.location,
            Arc::clone(&announcer),
            settings.modes.sounds(),
        )
        .with_override(settings.location.override_location.reading());

        Self {
            provider,
            player,
            announcer,
            modes,
            app_dir,
        }
    }

    /// Load the voice catalog and pick the configured or default voice
    pub async fn load_voices(&self, settings: &NavigatorSettings) -> Result<usize, SpeechError> {
        let catalog = self
            .player
            .load_voices(&settings.speech.language_prefix, settings.speech.voice.as_deref())
            .await?;
        Ok(catalog.len())
    }

    pub async fn toggle(&self, mode: OperatingMode) -> Result<OperatingMode, LocationError> {
        self.modes.toggle(mode).await
    }

    /// Entry point for external location collaborators
    pub fn update_location(&self, latitude: f64, longitude: f64, heading: f64) -> Result<ListenerState, LocationError> {
        self.provider.update(latitude, longitude, heading)
    }

    /// Location updates for other consumers such as a map view
    pub fn subscribe(&self) -> LocationSubscription {
        self.provider.subscribe()
    }

    /// Stop tracking and silence the player
    pub async fn shutdown(&self) {
        self.modes.shutdown().await;
        self.player.stop_and_clear();
    }
}
