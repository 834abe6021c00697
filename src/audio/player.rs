// Spatial audio player: one FIFO of sounds and speech, played strictly in order
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};

use super::sound::SoundBackend;
use super::speech::{SpeechBackend, Utterance};
use super::voices::{PlaybackRate, VoiceCatalog, VoiceDescriptor};
use crate::error::{PlaybackError, SpeechError, VoiceError};
use crate::queue::{PlaybackQueue, QueueItem};
use crate::spatial::{distance, relative_position, DistanceUnits, GeoPoint, LocationProvider, RelativePosition};

const RECENT_CALLOUT_LIMIT: usize = 50;

/// A located announcement that has been spoken, newest first in the history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentCallout {
    pub text: String,
    pub location: GeoPoint,
    pub spoken_at: DateTime<Utc>,
}

struct PlayerState {
    queue: PlaybackQueue,
    is_playing: bool,
    /// Bumped by every stop; a loop from an older generation must exit
    generation: u64,
    voices: VoiceCatalog,
    voice: Option<VoiceDescriptor>,
    rate: PlaybackRate,
    recent: VecDeque<RecentCallout>,
}

struct PlayerInner {
    state: Mutex<PlayerState>,
    interrupt: Notify,
    playing: watch::Sender<bool>,
    location: LocationProvider,
    sound: Arc<dyn SoundBackend>,
    speech: Arc<dyn SpeechBackend>,
    units: DistanceUnits,
    runtime: Handle,
}

/// Handle to the shared player. Clones drive the same queue.
#[derive(Clone)]
pub struct SpatialPlayer {
    inner: Arc<PlayerInner>,
}

impl SpatialPlayer {
    /// Must be called from within a Tokio runtime; the playback loop runs on it.
    pub fn new(
        location: LocationProvider,
        sound: Arc<dyn SoundBackend>,
        speech: Arc<dyn SpeechBackend>,
        units: DistanceUnits,
    ) -> Self {
        let (playing, _) = watch::channel(false);
        Self {
            inner: Arc::new(PlayerInner {
                state: Mutex::new(PlayerState {
                    queue: PlaybackQueue::new(),
                    is_playing: false,
                    generation: 0,
                    voices: VoiceCatalog::default(),
                    voice: None,
                    rate: PlaybackRate::default(),
                    recent: VecDeque::new(),
                }),
                interrupt: Notify::new(),
                playing,
                location,
                sound,
                speech,
                units,
                runtime: Handle::current(),
            }),
        }
    }

    /// Append an item; starts the playback loop if the player is idle
    pub fn enqueue(&self, item: QueueItem) {
        let mut state = self.inner.state.lock();
        state.queue.push(item);
        if state.is_playing {
            return;
        }

        state.is_playing = true;
        self.inner.playing.send_replace(true);
        let generation = state.generation;
        drop(state);

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(inner.run(generation));
    }

    /// Empty the queue and cut off whatever is playing right now
    pub fn stop_and_clear(&self) {
        {
            let mut state = self.inner.state.lock();
            state.queue.clear();
            state.is_playing = false;
            state.generation = state.generation.wrapping_add(1);
            self.inner.playing.send_replace(false);
        }

        self.inner.interrupt.notify_waiters();
        self.inner.sound.stop();
        self.inner.speech.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().is_playing
    }

    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Resolve once the queue has drained or been cleared
    pub async fn wait_until_idle(&self) {
        let mut playing = self.inner.playing.subscribe();
        let _ = playing.wait_for(|playing| !*playing).await;
    }

    /// Ask the speech backend for voices and select the default one.
    ///
    /// `preferred` picks a voice by name when it is in the catalog.
    pub async fn load_voices(&self, lang_prefix: &str, preferred: Option<&str>) -> Result<VoiceCatalog, SpeechError> {
        let all = self.inner.speech.voices().await?;
        let catalog = VoiceCatalog::from_voices(all, lang_prefix);

        let selected = preferred
            .and_then(|name| catalog.find_by_name(name))
            .or_else(|| catalog.default_voice())
            .cloned();

        tracing::info!(
            "Loaded {} voices, selected {:?}",
            catalog.len(),
            selected.as_ref().map(|v| v.name.as_str())
        );

        let mut state = self.inner.state.lock();
        state.voices = catalog.clone();
        state.voice = selected;
        Ok(catalog)
    }

    /// Applies from the next dequeued speech item
    pub fn set_voice(&self, index: usize) -> Result<VoiceDescriptor, VoiceError> {
        let mut state = self.inner.state.lock();
        let voice = state.voices.get(index)?.clone();
        state.voice = Some(voice.clone());
        Ok(voice)
    }

    pub fn voice(&self) -> Option<VoiceDescriptor> {
        self.inner.state.lock().voice.clone()
    }

    pub fn voices(&self) -> VoiceCatalog {
        self.inner.state.lock().voices.clone()
    }

    /// Applies from the next dequeued speech item
    pub fn set_rate(&self, rate: f32) -> f32 {
        let mut state = self.inner.state.lock();
        state.rate = PlaybackRate::new(rate);
        state.rate.value()
    }

    pub fn rate(&self) -> f32 {
        self.inner.state.lock().rate.value()
    }

    pub fn increase_rate(&self) -> f32 {
        let mut state = self.inner.state.lock();
        state.rate = state.rate.faster();
        state.rate.value()
    }

    pub fn decrease_rate(&self) -> f32 {
        let mut state = self.inner.state.lock();
        state.rate = state.rate.slower();
        state.rate.value()
    }

    pub fn recent_callouts(&self) -> Vec<RecentCallout> {
        self.inner.state.lock().recent.iter().cloned().collect()
    }
}

impl PlayerInner {
    /// Single consumer of the queue. Exits when the queue is empty or a stop
    /// has moved the generation on.
    async fn run(self: Arc<Self>, generation: u64) {
        loop {
            let interrupted = self.interrupt.notified();
            tokio::pin!(interrupted);
            interrupted.as_mut().enable();

            let (item, voice, rate) = {
                let mut state = self.state.lock();
                if state.generation != generation {
                    return;
                }
                match state.queue.pop() {
                    Some(item) => (item, state.voice.clone(), state.rate),
                    None => {
                        state.is_playing = false;
                        self.playing.send_replace(false);
                        return;
                    }
                }
            };

            tracing::debug!("Dequeued {:?}", item);
            tokio::select! {
                biased;
                _ = &mut interrupted => {
                    tracing::debug!("Playback interrupted by stop");
                    return;
                }
                result = self.play_item(item, voice, rate) => {
                    if let Err(e) = result {
                        tracing::warn!("Skipping audio item: {}", e);
                    }
                }
            }
        }
    }

    async fn play_item(
        &self,
        item: QueueItem,
        voice: Option<VoiceDescriptor>,
        rate: PlaybackRate,
    ) -> Result<(), PlaybackError> {
        item.validate()?;

        // Placement is computed now, not at enqueue time, since the user
        // may have moved while the item waited
        let listener = self.location.current();
        let position = match (item.location(), listener) {
            (Some(target), Some(listener)) => relative_position(&listener, &target),
            _ => RelativePosition::ORIGIN,
        };

        match item {
            QueueItem::SpatialSound { sound_url, .. } => self.sound.play(&sound_url, position).await,
            QueueItem::SpatialSpeech {
                mut text,
                location,
                include_distance,
            } => {
                if include_distance {
                    match (location, listener) {
                        (Some(target), Some(listener)) => {
                            let gap = distance(&listener, &target, self.units);
                            text = format!("{}, {} {}", text, gap.round() as i64, self.units.label());
                        }
                        _ => tracing::debug!("No distance for {:?}: listener or target unknown", text),
                    }
                }

                if let Some(location) = location {
                    self.remember(&text, location);
                }

                let utterance = Utterance { text, voice, rate };
                self.speech.speak(&utterance, position).await?;
                Ok(())
            }
        }
    }

    fn remember(&self, text: &str, location: GeoPoint) {
        let mut state = self.state.lock();
        state.recent.push_front(RecentCallout {
            text: text.to_string(),
            location,
            spoken_at: Utc::now(),
        });
        state.recent.truncate(RECENT_CALLOUT_LIMIT);
    }
}
