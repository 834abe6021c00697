// Audio playback module
// Uses Symphonia for decoding, rubato for resampling and cpal for output

pub mod cache;
pub mod decoder;
pub mod output;
pub mod panner;
pub mod player;
pub mod resample;
pub mod sound;
pub mod speech;
pub mod voices;

pub use cache::{AssetFetcher, FileFetcher, SoundCache};
pub use decoder::{AudioDecode, DecodedAudio, SymphoniaDecoder};
pub use output::{AudioEngine, AudioSink, SampleRing};
pub use panner::Panner;
pub use player::{RecentCallout, SpatialPlayer};
pub use sound::{BufferSoundBackend, SoundBackend};
pub use speech::{EspeakSpeech, SpeechBackend, Utterance};
pub use voices::{PlaybackRate, VoiceCatalog, VoiceDescriptor};
