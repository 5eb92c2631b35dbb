//! Wire-format audio ingestion: base64-wrapped little-endian 16-bit PCM.
//!
//! Streaming clients ship each chunk as `pcm16_base64` inside a JSON text
//! frame.  Both decoding steps are lossy-tolerant by contract: a payload
//! that fails to decode yields an *empty* chunk, which callers ignore — a
//! corrupted frame must never turn into a protocol error mid-utterance.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Decode a base64 payload into raw bytes.
///
/// Empty or malformed input yields an empty buffer, never an error.
pub fn decode_base64(payload: &str) -> Vec<u8> {
    if payload.is_empty() {
        return Vec::new();
    }
    BASE64.decode(payload).unwrap_or_default()
}

/// Convert little-endian signed 16-bit PCM bytes into `f32` samples in
/// `[-1.0, 1.0]`.
///
/// A trailing odd byte is dropped.  Scaling divides by 32 768 so that
/// `i16::MIN` maps exactly to `-1.0`; the positive side is clamped.
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            (sample as f32 / 32_768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
