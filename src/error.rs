// Error types shared across the callout engine
use thiserror::Error;

/// Failure to fetch or decode a sound asset.
///
/// The asset cache never stores an entry for a failed load, so the next
/// request for the same URL tries again.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch sound {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sound {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("decode task for {url} did not finish")]
    Interrupted { url: String },
}

/// A queue item that carries nothing playable.
#[derive(Debug, Error)]
#[error("unrecognized item in audio queue: {0}")]
pub struct UnrecognizedItemError(pub String);

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("invalid location reading ({latitude}, {longitude})")]
    InvalidReading { latitude: f64, longitude: f64 },

    #[error("location source failed: {0}")]
    Source(String),
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to start speech synthesizer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("speech synthesizer exited with status {0:?}")]
    Exited(Option<i32>),

    #[error("failed to list voices: {0}")]
    Voices(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no output device available")]
    NoDevice,

    #[error("failed to get default output config: {0}")]
    Config(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build output stream: {0}")]
    Build(String),

    #[error("failed to start stream: {0}")]
    Play(String),

    #[error("audio thread exited before the stream was ready")]
    ThreadExited,
}

#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("failed to read places: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse places: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("no voice at index {index} (catalog has {available})")]
pub struct VoiceError {
    pub index: usize,
    pub available: usize,
}

/// Everything that can go wrong while playing a single queue item.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Unrecognized(#[from] UnrecognizedItemError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("audio output failed: {0}")]
    Output(String),
}
