// Spatial sound effect playback
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::cache::SoundCache;
use super::output::AudioSink;
use super::panner::Panner;
use super::resample::resample_mono;
use crate::error::PlaybackError;
use crate::spatial::RelativePosition;

/// Plays one sound effect at a position and resolves when it has finished.
///
/// Implementations keep at most one sound live: starting a new one, or
/// calling `stop`, cuts off the previous one.
#[async_trait]
pub trait SoundBackend: Send + Sync {
    async fn play(&self, url: &str, position: RelativePosition) -> Result<(), PlaybackError>;

    fn stop(&self);
}

/// Decoded-buffer backend: cache, resample, pan, then stream into the sink
pub struct BufferSoundBackend {
    cache: Arc<SoundCache>,
    sink: Arc<dyn AudioSink>,
    panner: Panner,
    active: Mutex<Option<Arc<AtomicBool>>>,
    // Held for every write and every cut-off so a stopped writer never
    // lands samples after the clear
    device: Arc<Mutex<()>>,
}

impl BufferSoundBackend {
    pub fn new(cache: Arc<SoundCache>, sink: Arc<dyn AudioSink>, panner: Panner) -> Self {
        Self {
            cache,
            sink,
            panner,
            active: Mutex::new(None),
            device: Arc::new(Mutex::new(())),
        }
    }

    pub fn cache(&self) -> &Arc<SoundCache> {
        &self.cache
    }

    /// Cut off the current sound and hand out the stop flag for the next one.
    ///
    /// Returns once the previous sound can no longer reach the sink.
    fn preempt(&self) -> Arc<AtomicBool> {
        let stopped = Arc::new(AtomicBool::new(false));
        let previous = self.active.lock().replace(Arc::clone(&stopped));
        if let Some(previous) = previous {
            self.cut_off(&previous);
        }
        stopped
    }

    fn cut_off(&self, handle: &AtomicBool) {
        let _device = self.device.lock();
        handle.store(true, Ordering::SeqCst);
        self.sink.clear();
    }
}

#[async_trait]
impl SoundBackend for BufferSoundBackend {
    async fn play(&self, url: &str, position: RelativePosition) -> Result<(), PlaybackError> {
        let buffer = self.cache.load(url).await?;

        let panner = self.panner;
        let rate = self.sink.sample_rate();
        let channels = self.sink.channels();
        let samples = tokio::task::spawn_blocking(move || {
            let mono = resample_mono(&buffer.to_mono(), buffer.sample_rate, rate)?;
            Ok::<_, String>(panner.render(&mono, position, channels))
        })
        .await
        .map_err(|e| PlaybackError::Output(e.to_string()))?
        .map_err(PlaybackError::Output)?;

        let stopped = self.preempt();
        let handle = Arc::clone(&stopped);
        let sink = Arc::clone(&self.sink);
        let device = Arc::clone(&self.device);
        tracing::debug!("Playing {} at ({:.1}, {:.1})", url, position.x, position.y);

        tokio::task::spawn_blocking(move || stream_to_sink(sink.as_ref(), &device, &samples, &stopped))
            .await
            .map_err(|e| PlaybackError::Output(e.to_string()))?;

        // Finished on its own: nothing left for the next play to cut off
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|a| Arc::ptr_eq(a, &handle)) {
            *active = None;
        }
        Ok(())
    }

    fn stop(&self) {
        let active = self.active.lock().take();
        if let Some(active) = active {
            self.cut_off(&active);
        }
    }
}

/// Push samples until all are written and played, or until stopped
fn stream_to_sink(sink: &dyn AudioSink, device: &Mutex<()>, samples: &[f32], stopped: &AtomicBool) {
    let mut remaining = samples;

    while !remaining.is_empty() {
        let written = {
            let _device = device.lock();
            if stopped.load(Ordering::SeqCst) {
                return;
            }
            sink.write(remaining)
        };
        if written > 0 {
            remaining = &remaining[written..];
        } else {
            // Buffer full, wait a bit
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    // Wait for the device to drain what we queued
    while sink.queued() > 0 && !stopped.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(2));
    }
}
