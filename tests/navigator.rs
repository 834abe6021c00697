// End-to-end checks of the assembled navigator with recording backends
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use spatial_callouts::audio::{SoundBackend, SpeechBackend, Utterance, VoiceDescriptor};
use spatial_callouts::callout::StaticPlaces;
use spatial_callouts::error::{PlaybackError, SpeechError};
use spatial_callouts::spatial::geo::EARTH_RADIUS_M;
use spatial_callouts::spatial::{LocationReading, RelativePosition, ReplayLocationSource};
use spatial_callouts::{Backends, GeoPoint, Navigator, NavigatorSettings, OperatingMode, Place, QueueItem};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Sound(String),
    Speech(String, RelativePosition),
}

type Calls = Arc<Mutex<Vec<Call>>>;

struct RecordingSound(Calls);

#[async_trait]
impl SoundBackend for RecordingSound {
    async fn play(&self, url: &str, _position: RelativePosition) -> Result<(), PlaybackError> {
        self.0.lock().push(Call::Sound(url.to_string()));
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(())
    }

    fn stop(&self) {}
}

struct RecordingSpeech(Calls);

#[async_trait]
impl SpeechBackend for RecordingSpeech {
    async fn speak(&self, utterance: &Utterance, position: RelativePosition) -> Result<(), SpeechError> {
        self.0.lock().push(Call::Speech(utterance.text.clone(), position));
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(())
    }

    fn stop(&self) {}

    async fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError> {
        Ok(vec![VoiceDescriptor {
            name: "English_(America)".to_string(),
            lang: "en-us".to_string(),
            is_system_default: false,
            index: 0,
        }])
    }
}

fn meters_east(meters: f64) -> GeoPoint {
    GeoPoint::new(0.0, (meters / EARTH_RADIUS_M).to_degrees())
}

fn navigator(settings: &NavigatorSettings, track: Vec<LocationReading>, places: Vec<Place>) -> (Navigator, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let backends = Backends {
        sound: Arc::new(RecordingSound(calls.clone())),
        speech: Arc::new(RecordingSpeech(calls.clone())),
        location: Arc::new(ReplayLocationSource::new(track, Duration::from_secs(60))),
        places: Arc::new(StaticPlaces::new(places)),
    };
    (Navigator::new(settings, backends, PathBuf::from(".")), calls)
}

async fn settle(navigator: &Navigator) {
    tokio::time::timeout(Duration::from_secs(5), navigator.player.wait_until_idle())
        .await
        .expect("queue should drain");
}

fn sounds(calls: &Calls) -> Vec<String> {
    calls
        .lock()
        .iter()
        .filter_map(|c| match c {
            Call::Sound(url) => Some(url.clone()),
            Call::Speech(..) => None,
        })
        .collect()
}

#[tokio::test]
async fn sound_then_callout_with_distance_in_feet() {
    let settings = NavigatorSettings::default();
    let (navigator, calls) = navigator(&settings, vec![], vec![]);
    navigator.update_location(0.0, 0.0, 0.0).unwrap();

    navigator.player.enqueue(QueueItem::sound("enter.wav"));
    navigator
        .player
        .enqueue(QueueItem::callout("Coffee Shop", meters_east(100.0), true));
    settle(&navigator).await;

    let calls = calls.lock();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], Call::Sound("enter.wav".to_string()));
    match &calls[1] {
        Call::Speech(text, position) => {
            assert_eq!(text, "Coffee Shop, 328 feet");
            assert!((position.x - 100.0).abs() < 0.01);
            assert!(position.y.abs() < 0.01);
        }
        other => panic!("expected speech, got {:?}", other),
    }
}

#[tokio::test]
async fn toggling_callouts_twice_returns_to_none() {
    let settings = NavigatorSettings::default();
    let (navigator, calls) = navigator(&settings, vec![LocationReading::new(0.0, 0.0, Some(0.0))], vec![]);

    assert_eq!(
        navigator.toggle(OperatingMode::TrackingWithCallouts).await.unwrap(),
        OperatingMode::TrackingWithCallouts
    );
    settle(&navigator).await;
    assert_eq!(
        navigator.toggle(OperatingMode::TrackingWithCallouts).await.unwrap(),
        OperatingMode::None
    );
    settle(&navigator).await;

    assert_eq!(navigator.modes.mode().await, OperatingMode::None);
    assert_eq!(sounds(&calls), vec!["sounds/mode_enter.wav", "sounds/mode_exit.wav"]);
}

#[tokio::test]
async fn switching_modes_plays_one_exit_and_one_enter() {
    let settings = NavigatorSettings::default();
    let places = vec![Place::new("cafe", "Coffee Shop", meters_east(30.0))];
    let (navigator, calls) = navigator(&settings, vec![LocationReading::new(0.0, 0.0, Some(0.0))], places);

    navigator.toggle(OperatingMode::TrackingWithCallouts).await.unwrap();
    settle(&navigator).await;
    let before = sounds(&calls).len();

    assert_eq!(
        navigator.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap(),
        OperatingMode::AnnouncePlacesNearMe
    );
    settle(&navigator).await;

    let after = sounds(&calls);
    assert_eq!(after[before..], ["sounds/mode_exit.wav", "sounds/mode_enter.wav"]);

    let last = calls.lock().last().cloned();
    assert!(matches!(last, Some(Call::Speech(text, _)) if text == "Coffee Shop, 98 feet"));
}

#[tokio::test]
async fn near_me_uses_configured_override() {
    let mut settings = NavigatorSettings::default();
    settings.location.override_location.latitude = Some(0.0);
    settings.location.override_location.longitude = Some(0.0);
    settings.location.override_location.heading = Some(90.0);
    settings.callouts.include_distance = false;

    // 30 m east is straight ahead when facing east
    let places = vec![Place::new("cafe", "Coffee Shop", meters_east(30.0))];
    let (navigator, calls) = navigator(&settings, vec![], places);

    navigator.toggle(OperatingMode::AnnouncePlacesNearMe).await.unwrap();
    settle(&navigator).await;

    let calls = calls.lock();
    match calls.last() {
        Some(Call::Speech(text, position)) => {
            assert_eq!(text, "Coffee Shop");
            assert!(position.x.abs() < 0.01);
            assert!((position.y - 30.0).abs() < 0.01);
        }
        other => panic!("expected speech, got {:?}", other),
    }
}

#[tokio::test]
async fn near_me_without_location_is_an_error() {
    let settings = NavigatorSettings::default();
    let (navigator, calls) = navigator(&settings, vec![], vec![]);

    assert!(navigator.toggle(OperatingMode::AnnouncePlacesNearMe).await.is_err());
    assert_eq!(navigator.modes.mode().await, OperatingMode::None);
    settle(&navigator).await;
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn configured_voice_and_rate_reach_the_speech_backend() {
    let mut settings = NavigatorSettings::default();
    settings.speech.rate = 3.0;
    let (navigator, _calls) = navigator(&settings, vec![], vec![]);

    assert_eq!(navigator.load_voices(&settings).await.unwrap(), 1);
    assert_eq!(navigator.player.rate(), 3.0);
    assert_eq!(navigator.player.voice().unwrap().name, "English_(America)");
}
