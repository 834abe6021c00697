// Voice catalog and speech rate
use serde::{Deserialize, Serialize};

use crate::error::VoiceError;

pub const MIN_RATE: f32 = 0.1;
pub const MAX_RATE: f32 = 10.0;
const RATE_STEP: f32 = 1.0;

/// A synthesizer voice as reported by the speech backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub name: String,
    pub lang: String,
    pub is_system_default: bool,
    /// Position in the catalog the voice was selected from
    pub index: usize,
}

/// Usable voices, filtered to one language family and unique by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceCatalog {
    voices: Vec<VoiceDescriptor>,
}

impl VoiceCatalog {
    /// Keep voices whose language starts with `lang_prefix`, first voice per name wins
    pub fn from_voices(all: Vec<VoiceDescriptor>, lang_prefix: &str) -> Self {
        let mut voices: Vec<VoiceDescriptor> = Vec::new();
        for voice in all {
            if !voice.lang.starts_with(lang_prefix) {
                continue;
            }
            if voices.iter().any(|v| v.name == voice.name) {
                continue;
            }
            voices.push(voice);
        }

        for (index, voice) in voices.iter_mut().enumerate() {
            voice.index = index;
        }
        Self { voices }
    }

    pub fn get(&self, index: usize) -> Result<&VoiceDescriptor, VoiceError> {
        self.voices.get(index).ok_or(VoiceError {
            index,
            available: self.voices.len(),
        })
    }

    pub fn find_by_name(&self, name: &str) -> Option<&VoiceDescriptor> {
        self.voices.iter().find(|v| v.name == name)
    }

    /// The system default voice, or the first voice when none is flagged
    pub fn default_voice(&self) -> Option<&VoiceDescriptor> {
        self.voices
            .iter()
            .find(|v| v.is_system_default)
            .or_else(|| self.voices.first())
    }

    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

/// Speech rate multiplier; 1.0 is the synthesizer's normal pace
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PlaybackRate(f32);

impl Default for PlaybackRate {
    fn default() -> Self {
        Self(2.0)
    }
}

impl PlaybackRate {
    /// Clamped into `MIN_RATE..=MAX_RATE`; non-finite input falls back to the default
    pub fn new(value: f32) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        Self(value.clamp(MIN_RATE, MAX_RATE))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn faster(self) -> Self {
        Self::new(self.0 + RATE_STEP)
    }

    pub fn slower(self) -> Self {
        Self::new(self.0 - RATE_STEP)
    }
}
