//! Audio ingestion pipeline — wire decoding → rate conversion → energy gate.
//!
//! # Pipeline
//!
//! ```text
//! pcm16_base64 → decode_base64 → pcm16_to_f32 → resample(input_rate, 16 kHz)
//!             → session buffer append → has_speech (decode gate)
//! ```
//!
//! Everything here is pure and synchronous; the streaming layer owns all
//! state and locking.

pub mod pcm;
pub mod resample;
pub mod vad;

pub use pcm::{decode_base64, pcm16_to_f32};
pub use resample::{resample, stereo_to_mono};
pub use vad::{has_speech, rms};
