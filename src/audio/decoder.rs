// Sound effect decoder using Symphonia
// Decodes a whole in-memory file to interleaved f32 PCM

use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// A fully decoded sound, shared between plays
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: usize,
    /// Interleaved samples
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }
}

/// The native `decodeAudio(bytes)` capability
pub trait AudioDecode: Send + Sync {
    /// `extension` is a format hint taken from the asset URL
    fn decode(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, String>;
}

/// Decoder backed by Symphonia's default codec registry
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl AudioDecode for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, String> {
        let mut stream = AudioStream::open(bytes, extension)?;
        let mut samples = Vec::new();
        while let Some(chunk) = stream.decode_next()? {
            samples.extend_from_slice(&chunk);
        }

        Ok(DecodedAudio {
            sample_rate: stream.sample_rate,
            channels: stream.channels,
            samples,
        })
    }
}

struct AudioStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl AudioStream {
    fn open(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, String> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| format!("Failed to probe format: {}", e))?;

        let format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| "No audio track found".to_string())?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| format!("Failed to create decoder: {}", e))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Decode next packet, returns interleaved f32 samples
    /// Returns None when end of stream is reached
    fn decode_next(&mut self) -> Result<Option<Vec<f32>>, String> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(format!("Failed to read packet: {}", e)),
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => return Ok(Some(audio_buf_to_f32(&decoded))),
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(format!("Decode failed: {}", e)),
            }
        }
    }
}

/// Convert any AudioBufferRef to interleaved f32 samples
fn audio_buf_to_f32(buf: &AudioBufferRef) -> Vec<f32> {
    match buf {
        AudioBufferRef::F32(b) => interleave(b.planes(), b.frames(), |s: f32| s),
        AudioBufferRef::F64(b) => interleave(b.planes(), b.frames(), |s: f64| s as f32),
        AudioBufferRef::S8(b) => interleave(b.planes(), b.frames(), |s: i8| s as f32 / 128.0),
        AudioBufferRef::S16(b) => interleave(b.planes(), b.frames(), |s: i16| s as f32 / 32768.0),
        AudioBufferRef::S24(b) => interleave(b.planes(), b.frames(), |s| s.inner() as f32 / 8388608.0),
        AudioBufferRef::S32(b) => interleave(b.planes(), b.frames(), |s: i32| s as f32 / 2147483648.0),
        AudioBufferRef::U8(b) => interleave(b.planes(), b.frames(), |s: u8| (s as f32 - 128.0) / 128.0),
        AudioBufferRef::U16(b) => interleave(b.planes(), b.frames(), |s: u16| (s as f32 - 32768.0) / 32768.0),
        AudioBufferRef::U24(b) => {
            interleave(b.planes(), b.frames(), |s| (s.inner() as f32 - 8388608.0) / 8388608.0)
        }
        AudioBufferRef::U32(b) => {
            interleave(b.planes(), b.frames(), |s: u32| ((s as f64 - 2147483648.0) / 2147483648.0) as f32)
        }
    }
}

fn interleave<T: Sample + Copy, F: Fn(T) -> f32>(planes: AudioPlanes<T>, frames: usize, convert: F) -> Vec<f32> {
    let planes = planes.planes();
    if planes.is_empty() || frames == 0 {
        return vec![];
    }

    let mut interleaved = Vec::with_capacity(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            interleaved.push(convert(plane[frame]));
        }
    }
    interleaved
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal 16-bit PCM WAV file
    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_decode_wav() {
        let samples: Vec<i16> = (0..800).map(|i| if i % 2 == 0 { 16384 } else { -16384 }).collect();
        let decoded = SymphoniaDecoder
            .decode(wav_bytes(8000, 2, &samples), Some("wav"))
            .unwrap();

        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frames(), 400);
        assert!((decoded.samples[0] - 0.5).abs() < 1e-4);
        assert!((decoded.samples[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_garbage_fails() {
        assert!(SymphoniaDecoder.decode(vec![0u8; 64], Some("wav")).is_err());
    }

    #[test]
    fn test_to_mono() {
        let audio = DecodedAudio {
            sample_rate: 8000,
            channels: 2,
            samples: vec![1.0, 0.0, 0.5, 0.5],
        };
        assert_eq!(audio.to_mono(), vec![0.5, 0.5]);
    }
}
