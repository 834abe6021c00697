// Audio output using cpal
// The engine owns the output stream on its own thread and is fed through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{HeapRb, traits::{Consumer, Observer, Producer, Split}};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::OutputError;

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Destination for rendered interleaved samples
pub trait AudioSink: Send + Sync {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Write as many samples as fit, returns the number written
    fn write(&self, samples: &[f32]) -> usize;

    /// Samples written but not yet played
    fn queued(&self) -> usize;

    /// Drop everything not yet played. Samples written after this returns are kept.
    fn clear(&self);
}

/// Samples on their way to the device.
///
/// Writers push at one end and the device callback pops from the other.
/// `clear` has emptied the ring by the time it returns, so samples written
/// after it are always played.
pub struct SampleRing {
    producer: Mutex<RingProducer>,
    consumer: Mutex<RingConsumer>,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        Self {
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
        }
    }

    /// Push as many samples as fit, returns the number pushed
    pub fn push(&self, samples: &[f32]) -> usize {
        self.producer.lock().push_slice(samples)
    }

    pub fn queued(&self) -> usize {
        self.producer.lock().occupied_len()
    }

    pub fn clear(&self) {
        let mut consumer = self.consumer.lock();
        while consumer.try_pop().is_some() {}
    }

    /// Device side: fill `out`, padding with silence once the ring runs dry
    pub fn render<T: cpal::SizedSample + cpal::FromSample<f32>>(&self, out: &mut [T], volume: f32) {
        let mut consumer = self.consumer.lock();
        for sample in out.iter_mut() {
            let value = consumer.try_pop().unwrap_or(0.0) * volume;
            *sample = T::from_sample(value);
        }
    }
}

struct EngineShared {
    ring: Arc<SampleRing>,
    sample_rate: u32,
    channels: u16,
}

/// Process-wide audio output.
///
/// Constructed explicitly with [`AudioEngine::start`] and passed to the
/// components that need it. The cpal stream never leaves the engine thread;
/// the thread ends and the stream closes on [`AudioEngine::shutdown`] or drop.
pub struct AudioEngine {
    shared: Arc<EngineShared>,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioEngine {
    /// Open the default output device
    pub fn start(volume: f32) -> Result<Self, OutputError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match Self::open_stream(volume) {
                    Ok((stream, shared)) => {
                        let _ = ready_tx.send(Ok(shared));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until shutdown is requested or the engine is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                tracing::debug!("Audio output stream closed");
            })
            .map_err(|e| OutputError::Build(e.to_string()))?;

        let shared = ready_rx.recv().map_err(|_| OutputError::ThreadExited)??;
        tracing::info!(
            "Audio output ready: {} Hz, {} channels",
            shared.sample_rate,
            shared.channels
        );

        Ok(Self {
            shared,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn open_stream(volume: f32) -> Result<(Stream, Arc<EngineShared>), OutputError> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| OutputError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        // Ring buffer for passing samples to the audio callback
        let ring = Arc::new(SampleRing::new(RING_BUFFER_SIZE));
        let volume = volume.clamp(0.0, 1.0);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config.into(), ring.clone(), volume)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config.into(), ring.clone(), volume)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config.into(), ring.clone(), volume)?,
            format => return Err(OutputError::UnsupportedFormat(format!("{:?}", format))),
        };

        stream.play().map_err(|e| OutputError::Play(e.to_string()))?;

        let shared = Arc::new(EngineShared {
            ring,
            sample_rate,
            channels,
        });
        Ok((stream, shared))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        ring: Arc<SampleRing>,
        volume: f32,
    ) -> Result<Stream, OutputError> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    ring.render(data, volume);
                },
                move |err| {
                    tracing::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| OutputError::Build(e.to_string()))
    }

    /// Close the output stream and join the audio thread
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

impl AudioSink for AudioEngine {
    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    fn channels(&self) -> u16 {
        self.shared.channels
    }

    fn write(&self, samples: &[f32]) -> usize {
        self.shared.ring.push(samples)
    }

    fn queued(&self) -> usize {
        self.shared.ring.queued()
    }

    fn clear(&self) {
        self.shared.ring.clear();
    }
}
