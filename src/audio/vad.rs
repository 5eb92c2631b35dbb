//! Energy-based voice activity gate.
//!
//! Decoding is the expensive resource in this daemon, so every candidate
//! segment is screened with a cheap root-mean-square energy check before it
//! is handed to the model.  Two thresholds are in play, both configured in
//! [`crate::config::StreamConfig`]:
//!
//! * a **strict** threshold gating partial-window decodes while streaming,
//! * a **relaxed** threshold gating the tail decode at finalization, where
//!   missing quiet speech is worse than wasting one decode.
//!
//! This is deliberately not a real VAD — no model, no hysteresis, no frame
//! classification.  Whole-segment RMS against a constant is all the
//! scheduler needs.

// ---------------------------------------------------------------------------
// rms / has_speech
// ---------------------------------------------------------------------------

/// Root-mean-square amplitude of `samples`.  Empty input has zero energy.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

/// Returns `true` when `samples` carry enough energy to be worth decoding.
///
/// Empty input is never speech.  The comparison is inclusive (`rms >=
/// threshold`) so a threshold of `0.0` admits any non-empty segment.
///
/// # Example
///
/// ```rust
/// use streamscribe::audio::has_speech;
///
/// let silence = vec![0.0_f32; 1600];
/// let tone = vec![0.5_f32; 1600];
/// assert!(!has_speech(&silence, 0.008));
/// assert!(has_speech(&tone, 0.008));
/// ```
pub fn has_speech(samples: &[f32], threshold: f32) -> bool {
    if samples.is_empty() {
        return false;
    }
    rms(samples) >= threshold
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_never_speech() {
        assert!(!has_speech(&[], 0.0));
        assert!(!has_speech(&[], 0.008));
    }

    #[test]
    fn silence_is_below_threshold() {
        let silence = vec![0.0_f32; 1600];
        assert!(!has_speech(&silence, 0.008));
    }

    #[test]
    fn loud_signal_passes() {
        let tone = vec![0.5_f32; 1600];
        assert!(has_speech(&tone, 0.008));
    }

    #[test]
    fn threshold_is_inclusive() {
        // A constant 0.01 signal has RMS exactly 0.01.
        let signal = vec![0.01_f32; 100];
        assert!(has_speech(&signal, 0.01));
    }

    #[test]
    fn relaxed_threshold_admits_quieter_audio() {
        let quiet = vec![0.005_f32; 1600];
        assert!(!has_speech(&quiet, 0.008));
        assert!(has_speech(&quiet, 0.003));
    }

    #[test]
    fn rms_of_alternating_signal() {
        // ±0.5 square wave → RMS 0.5 regardless of sign.
        let square: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert!((rms(&square) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rms_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }
}
