// Coarse spatial panning: left/right balance plus distance attenuation
//
// Not HRTF. Azimuth drives an equal-power stereo pan, distance drives an
// inverse rolloff like the Web Audio "inverse" distance model.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

use crate::spatial::RelativePosition;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Panner {
    /// Distance in meters at which attenuation starts
    pub ref_distance: f64,
    pub rolloff: f64,
    /// Beyond this distance sounds get no quieter
    pub max_distance: f64,
}

impl Default for Panner {
    fn default() -> Self {
        Self {
            ref_distance: 10.0,
            rolloff: 1.0,
            max_distance: 1000.0,
        }
    }
}

/// Per-channel gains for one placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoGains {
    pub left: f32,
    pub right: f32,
}

impl Panner {
    /// Out-of-order distances are fixed up so that `ref_distance <= max_distance`
    pub fn new(ref_distance: f64, rolloff: f64, max_distance: f64) -> Self {
        let ref_distance = ref_distance.max(f64::EPSILON);
        Self {
            ref_distance,
            rolloff: rolloff.max(0.0),
            max_distance: max_distance.max(ref_distance),
        }
    }

    pub fn gains(&self, position: RelativePosition) -> StereoGains {
        let distance = position.distance();

        // -1 is hard left, +1 hard right; sources behind fold onto the same axis
        let pan = if distance > 0.0 { position.x / distance } else { 0.0 };
        let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        let attenuation = self.attenuation(distance);

        StereoGains {
            left: (angle.cos() * attenuation) as f32,
            right: (angle.sin() * attenuation) as f32,
        }
    }

    fn attenuation(&self, distance: f64) -> f64 {
        let reference = self.ref_distance.max(f64::EPSILON);
        let max = self.max_distance.max(reference);
        let clamped = distance.clamp(reference, max);
        reference / (reference + self.rolloff.max(0.0) * (clamped - reference))
    }

    /// Spread a mono signal across an output with `channels` channels.
    ///
    /// Stereo-or-wider outputs get the pair on the first two channels; a mono
    /// output gets the average of both gains.
    pub fn render(&self, mono: &[f32], position: RelativePosition, channels: u16) -> Vec<f32> {
        let gains = self.gains(position);
        let channels = channels.max(1) as usize;
        let mut out = Vec::with_capacity(mono.len() * channels);

        for &sample in mono {
            if channels == 1 {
                out.push(sample * (gains.left + gains.right) / 2.0);
                continue;
            }
            out.push(sample * gains.left);
            out.push(sample * gains.right);
            out.extend(std::iter::repeat(0.0).take(channels - 2));
        }
        out
    }
}
