// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::voices::{MAX_RATE, MIN_RATE};
use crate::audio::Panner;
use crate::callout::CalloutPolicy;
use crate::mode::ModeSounds;
use crate::spatial::{DistanceUnits, LocationReading};

/// Speech synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub rate: f32, // 0.1-10.0, 1.0 is the synthesizer's normal pace
    pub voice: Option<String>,
    pub program: String,
    pub language_prefix: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 2.0,
            voice: None,
            program: "espeak-ng".to_string(),
            language_prefix: "en".to_string(),
        }
    }
}

/// Output and spatialization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub volume: f32, // 0.0-1.0
    pub ref_distance_m: f64,
    pub rolloff: f64,
    pub max_distance_m: f64,
    pub sound_root: PathBuf,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            ref_distance_m: 10.0,
            rolloff: 1.0,
            max_distance_m: 1000.0,
            sound_root: PathBuf::from("."),
        }
    }
}

impl AudioSettings {
    pub fn panner(&self) -> Panner {
        Panner::new(self.ref_distance_m, self.rolloff, self.max_distance_m)
    }
}

/// Which places get called out, and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalloutSettings {
    pub proximity_threshold_m: f64,
    pub cooldown_secs: Option<u64>, // None = announce once until the mode is re-entered
    pub include_distance: bool,
    pub distance_units: DistanceUnits,
}

impl Default for CalloutSettings {
    fn default() -> Self {
        Self {
            proximity_threshold_m: 100.0,
            cooldown_secs: None,
            include_distance: true,
            distance_units: DistanceUnits::Feet,
        }
    }
}

impl CalloutSettings {
    pub fn policy(&self) -> CalloutPolicy {
        CalloutPolicy {
            proximity_threshold_m: self.proximity_threshold_m,
            cooldown: self
                .cooldown_secs
                .map(|secs| chrono::Duration::seconds(secs.min(u32::MAX as u64) as i64)),
            include_distance: self.include_distance,
        }
    }
}

/// Mode change cues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSettings {
    pub enter_sound: String,
    pub exit_sound: String,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            enter_sound: "sounds/mode_enter.wav".to_string(),
            exit_sound: "sounds/mode_exit.wav".to_string(),
        }
    }
}

impl ModeSettings {
    pub fn sounds(&self) -> ModeSounds {
        ModeSounds {
            enter: self.enter_sound.clone(),
            exit: self.exit_sound.clone(),
        }
    }
}

/// Fixed position used instead of the location source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationOverride {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub heading: Option<f64>,
}

impl LocationOverride {
    /// Only a complete override counts
    pub fn reading(&self) -> Option<LocationReading> {
        match (self.latitude, self.longitude, self.heading) {
            (Some(latitude), Some(longitude), Some(heading)) => {
                Some(LocationReading::new(latitude, longitude, Some(heading)))
            }
            _ => None,
        }
    }
}

/// Location and place data settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    #[serde(rename = "override")]
    pub override_location: LocationOverride,
    pub track_file: Option<PathBuf>,
    pub track_interval_ms: u64,
    pub places_file: Option<PathBuf>,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            override_location: LocationOverride::default(),
            track_file: None,
            track_interval_ms: 1000,
            places_file: None,
        }
    }
}

impl LocationSettings {
    pub fn track_interval(&self) -> Duration {
        Duration::from_millis(self.track_interval_ms.max(1))
    }
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorSettings {
    pub version: i32, // Settings schema version for future migrations
    pub speech: SpeechSettings,
    pub audio: AudioSettings,
    pub callouts: CalloutSettings,
    pub modes: ModeSettings,
    pub location: LocationSettings,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            version: 1,
            speech: SpeechSettings::default(),
            audio: AudioSettings::default(),
            callouts: CalloutSettings::default(),
            modes: ModeSettings::default(),
            location: LocationSettings::default(),
        }
    }
}

impl NavigatorSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            tracing::info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let mut settings: NavigatorSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings {:?}", path))?;
        settings.clamp();

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        // Ensure directory exists
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content).with_context(|| format!("Failed to write settings file {:?}", path))?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Resolve a path from the settings against the app directory
    pub fn resolve(app_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            app_dir.join(path)
        }
    }

    fn clamp(&mut self) {
        if !self.speech.rate.is_finite() {
            self.speech.rate = SpeechSettings::default().rate;
        }
        self.speech.rate = self.speech.rate.clamp(MIN_RATE, MAX_RATE);
        if !self.audio.volume.is_finite() {
            self.audio.volume = AudioSettings::default().volume;
        }
        self.audio.volume = self.audio.volume.clamp(0.0, 1.0);
    }
}
