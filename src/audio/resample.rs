// Sample rate conversion for decoded effects using rubato
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 1024;

/// Convert a mono signal from one sample rate to another.
///
/// The output has exactly `len * to / from` samples, with the resampler's
/// internal delay trimmed off.
pub fn resample_mono(input: &[f32], from: u32, to: u32) -> Result<Vec<f32>, String> {
    if from == to || input.is_empty() {
        return Ok(input.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK_SIZE, 2, 1)
        .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let expected = (input.len() as u64 * to as u64 / from as u64) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let frames = resampler.input_frames_next();
        let block: &[&[f32]] = &[&input[pos..pos + frames]];
        let chunk = resampler
            .process(block, None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        output.extend_from_slice(&chunk[0]);
        pos += frames;
    }

    if pos < input.len() {
        let tail: &[&[f32]] = &[&input[pos..]];
        let chunk = resampler
            .process_partial(Some(tail), None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the tail still held inside the resampler
    while output.len() < delay + expected {
        let flush: Option<&[Vec<f32>]> = None;
        let chunk = resampler
            .process_partial(flush, None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    Ok(output.into_iter().skip(delay).take(expected).collect())
}
