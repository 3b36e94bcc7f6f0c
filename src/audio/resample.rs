//! Channel downmix and linear-interpolation resampling.
//!
//! The capture device delivers interleaved audio at its native rate and
//! channel count; the wire format wants 16 kHz mono.  The output side reuses
//! [`resample`] to stretch 24 kHz synthesized speech onto whatever rate the
//! output device runs at.

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Average interleaved multi-channel audio down to a single channel.
///
/// Output length is `samples.len() / channels`.  Mono input is returned
/// unchanged; zero channels yields an empty vector.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono audio from `source_rate` to `target_rate` Hz by linear
/// interpolation.
///
/// Returns the input unchanged when the rates already match.  Output length
/// is `ceil(samples.len() * target_rate / source_rate)`.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let s0 = samples.get(idx).copied().unwrap_or(0.0);
        let s1 = samples.get(idx + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
