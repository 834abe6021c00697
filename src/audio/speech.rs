// Synthesized speech playback
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;

use super::voices::{PlaybackRate, VoiceDescriptor};
use crate::error::SpeechError;
use crate::spatial::RelativePosition;

/// espeak's normal pace in words per minute
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const MIN_WORDS_PER_MINUTE: f32 = 80.0;
const MAX_WORDS_PER_MINUTE: f32 = 450.0;

/// Text plus the voice settings in force when it was dequeued
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<VoiceDescriptor>,
    pub rate: PlaybackRate,
}

/// Speaks one utterance and resolves when it has finished.
///
/// At most one utterance is live: `speak` stops whatever is still talking
/// before starting, and `stop` cuts it off.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// `position` is accepted for placement; backends without panning ignore it
    async fn speak(&self, utterance: &Utterance, position: RelativePosition) -> Result<(), SpeechError>;

    fn stop(&self);

    async fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError>;
}

/// Speech through an espeak-compatible command line synthesizer.
///
/// No panning: the position is only logged.
pub struct EspeakSpeech {
    program: String,
    active: Mutex<Option<oneshot::Sender<()>>>,
}

impl EspeakSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            active: Mutex::new(None),
        }
    }

    fn command(&self, utterance: &Utterance) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-s").arg(words_per_minute(utterance.rate).to_string());
        if let Some(voice) = &utterance.voice {
            command.arg("-v").arg(&voice.name);
        }
        command
            .arg("--")
            .arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl SpeechBackend for EspeakSpeech {
    async fn speak(&self, utterance: &Utterance, position: RelativePosition) -> Result<(), SpeechError> {
        // Cancel the current utterance if any
        self.stop();

        let (cancel_tx, cancel_rx) = oneshot::channel();
        *self.active.lock() = Some(cancel_tx);

        tracing::debug!(
            "Speaking {:?} at ({:.1}, {:.1})",
            utterance.text,
            position.x,
            position.y
        );
        let mut child = self.command(utterance).spawn().map_err(|source| SpeechError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| SpeechError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;
                if !status.success() {
                    return Err(SpeechError::Exited(status.code()));
                }
            }
            _ = cancel_rx => {
                let _ = child.kill().await;
            }
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(cancel) = self.active.lock().take() {
            let _ = cancel.send(());
        }
    }

    async fn voices(&self) -> Result<Vec<VoiceDescriptor>, SpeechError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .await
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SpeechError::Voices(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn words_per_minute(rate: PlaybackRate) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate.value()).clamp(MIN_WORDS_PER_MINUTE, MAX_WORDS_PER_MINUTE) as u32
}

/// Parse `--voices` output:
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en              --/M      English_(Great_Britain) gmw/en          (en 2)
/// ```
///
/// espeak's built-in default is the plain `en` voice.
pub fn parse_voice_list(listing: &str) -> Vec<VoiceDescriptor> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            Some((fields[1], fields[3]))
        })
        .enumerate()
        .map(|(index, (lang, name))| VoiceDescriptor {
            name: name.to_string(),
            lang: lang.to_string(),
            is_system_default: lang == "en",
            index,
        })
        .collect()
}
