//! Sample-rate conversion.
//!
//! Every session may push audio at its own capture rate, but the Whisper
//! model expects **16 kHz mono `f32`**.  [`resample`] converts between any
//! two rates with plain linear interpolation — fast, allocation-light, and
//! accurate enough for speech (the model is far more tolerant of
//! interpolation artefacts than of dropped audio).

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample `samples` from `from_rate` Hz to `to_rate` Hz using linear
/// interpolation.
///
/// Returns the input unchanged (as an owned `Vec`) when no conversion is
/// meaningful — equal rates, a zero rate, or an empty input.  This is a
/// no-op, not an error: callers feed whatever the client declared and the
/// degenerate cases simply pass through.
///
/// The output length is `round(duration_secs * to_rate)` with a minimum of
/// one sample, so even a sub-sample sliver of audio survives conversion.
///
/// # Example
///
/// ```rust
/// use streamscribe::audio::resample;
///
/// // Already at the target rate — no-op
/// let mono_16k = vec![0.1_f32; 160];
/// let out = resample(&mono_16k, 16_000, 16_000);
/// assert_eq!(out.len(), mono_16k.len());
///
/// // Downsample from 48 kHz to 16 kHz (ratio = 1/3)
/// let hi = vec![0.5_f32; 480];
/// let lo = resample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 || from_rate == to_rate {
        return samples.to_vec();
    }

    let duration = samples.len() as f64 / from_rate as f64;
    let out_len = ((duration * to_rate as f64).round() as usize).max(1);

    // Map each output index onto a fractional position in the source,
    // spanning [0, len-1] inclusive at both ends.
    let src_span = (samples.len() - 1) as f64;
    let step = if out_len > 1 {
        src_span / (out_len - 1) as f64
    } else {
        0.0
    };

    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * step;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples[samples.len() - 1]
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input is returned as an owned `Vec` unchanged.
/// * If `channels == 0` an empty vector is returned.
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
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
// Tests
// ---------------------------------------------------------------------------
