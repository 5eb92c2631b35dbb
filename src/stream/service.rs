//! Streaming transcription service — the orchestration layer behind the
//! transport.
//!
//! [`StreamService`] owns the session store and the inference engine and
//! exposes the three streaming operations (start / push / stop) plus the
//! single-shot batch path.  All methods **block** (the engine serializes
//! inference process-wide); transport handlers call them through
//! `tokio::task::spawn_blocking`.
//!
//! # Lock choreography per chunk
//!
//! ```text
//! store lock ─ append chunk, plan decode, copy window ─ unlock
//!                │ (no plan → return committed text)
//!                ▼
//! energy gate (no lock)
//!                ▼
//! engine lock ─ decode ─ unlock          ← the slow part
//!                ▼
//! store lock ─ merge + record decode ─ unlock
//! store lock ─ advance cursor ─ unlock
//! ```
//!
//! The store lock and the engine lock are never held together, so one
//! session's decode never stalls another session's chunk traffic.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::audio::{has_speech, pcm16_to_f32, resample, stereo_to_mono};
use crate::config::{StreamConfig, SttConfig};
use crate::session::{SessionStore, StreamSession};
use crate::stream::finalize::{finalize, FinalizeInput};
use crate::stream::scheduler::plan_decode;
use crate::stt::{available_models, canonical_model_id, SttEngine, SttError};
use crate::text::{collapse_doubling, merge_transcript};

// ---------------------------------------------------------------------------
// FinalTranscript / BatchError
// ---------------------------------------------------------------------------

/// Result of stopping a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalTranscript {
    /// Finished transcript; empty when every fallback stage came up dry.
    pub text: String,
    /// Wall-clock milliseconds from session creation to finalization.
    pub latency_ms: u64,
}

/// Errors from the single-shot batch transcription path.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The request named a missing or unreadable file.
    #[error("Invalid file path")]
    InvalidPath,

    /// The file exists but could not be parsed as WAV audio.
    #[error("Failed to read WAV: {0}")]
    Wav(String),

    /// The inference backend failed.
    #[error(transparent)]
    Stt(#[from] SttError),
}

// ---------------------------------------------------------------------------
// StreamService
// ---------------------------------------------------------------------------

/// Orchestrates streaming sessions over a shared store and a single-flight
/// inference engine.
pub struct StreamService {
    store: Arc<SessionStore>,
    engine: Arc<dyn SttEngine>,
    stream_cfg: StreamConfig,
    stt_cfg: SttConfig,
}

impl StreamService {
    pub fn new(engine: Arc<dyn SttEngine>, stream_cfg: StreamConfig, stt_cfg: SttConfig) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            engine,
            stream_cfg,
            stt_cfg,
        }
    }

    /// The session registry (shared with tests and introspection).
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Model ids advertised to clients.
    pub fn available_models(&self) -> Vec<&'static str> {
        available_models()
    }

    // -----------------------------------------------------------------------
    // Streaming operations
    // -----------------------------------------------------------------------

    /// Create (or overwrite) the session for `id`.  Language and model fall
    /// back to the configured defaults; the model id is canonicalized.
    pub fn start_session(
        &self,
        id: &str,
        sample_rate: u32,
        language: Option<&str>,
        model: Option<&str>,
    ) {
        let language = match language {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.stt_cfg.language.clone(),
        };
        let model = canonical_model_id(model.unwrap_or(""));

        log::info!(
            "stream session started ({id}) input_sr={} model_sr={} model={model}",
            sample_rate.max(1),
            self.stream_cfg.model_sample_rate
        );
        self.store
            .create(StreamSession::new(id, sample_rate, language, model));
    }

    /// Append a PCM16 chunk and run at most one partial-decode attempt.
    ///
    /// Returns the session's committed text when it is non-empty (the
    /// transport emits it as a partial transcript), `None` otherwise.  A
    /// missing session — including one disposed concurrently — is a silent
    /// no-op, as is an empty or undecodable chunk.
    pub fn push_chunk(&self, id: &str, pcm16: &[u8]) -> Option<String> {
        // Snapshot the fixed inference parameters; bail silently if the
        // session is gone.
        let (input_rate, language, model) = self
            .store
            .with_session(id, |s| (s.input_sample_rate, s.language.clone(), s.model.clone()))?;

        let chunk = pcm16_to_f32(pcm16);
        if chunk.is_empty() {
            return self.committed_text(id);
        }
        let chunk = resample(&chunk, input_rate, self.stream_cfg.model_sample_rate);

        // Append and plan in one critical section; copy the window out so
        // the decode below runs without the store lock.
        let planned = self.store.with_session(id, |s| {
            s.audio.extend_from_slice(&chunk);
            let elapsed = s.last_decode_at.map(|at| at.elapsed());
            let plan = plan_decode(&self.stream_cfg, s.audio.len(), s.decode_cursor, elapsed);
            plan.map(|p| {
                let window = s.audio[p.window_start..p.window_end].to_vec();
                (p, window)
            })
        })?;

        if let Some((plan, window)) = planned {
            if has_speech(&window, self.stream_cfg.vad_rms_threshold) {
                let t0 = Instant::now();
                let decoded = match self.engine.decode(&window, &language, &model) {
                    Ok(text) => {
                        log::info!(
                            "stream partial decoded ({id}) len={} took_ms={}",
                            window.len(),
                            t0.elapsed().as_millis()
                        );
                        text
                    }
                    Err(e) => {
                        // Committed text stays untouched; the merge below is
                        // a no-op for empty input.
                        log::error!("stream partial decode failed ({id}): {e}");
                        String::new()
                    }
                };

                // The session may have been stopped while we decoded.
                self.store.with_session(id, |s| {
                    s.committed_text = merge_transcript(&s.committed_text, &decoded);
                    s.last_decode_at = Some(Instant::now());
                    s.last_decode_total_samples = plan.buffer_len;
                });
            }

            // The cursor advances after every decode attempt, gated or not:
            // only the overlap tail stays undecided for the next window.
            self.store.with_session(id, |s| {
                s.decode_cursor = plan.next_cursor.min(s.audio.len());
            });
        }

        self.committed_text(id)
    }

    /// Stop `id`: drain the session, run the finalization fallback chain,
    /// and return the final transcript.
    ///
    /// A never-started (or already stopped) id yields an empty transcript
    /// with zero latency — not an error.
    pub fn stop_session(&self, id: &str) -> FinalTranscript {
        let Some(session) = self.store.remove(id) else {
            return FinalTranscript {
                text: String::new(),
                latency_ms: 0,
            };
        };

        let started_at = session.started_at;
        let input = FinalizeInput::from_session(session);
        let text = finalize(
            self.engine.as_ref(),
            &self.stream_cfg,
            &self.stt_cfg.rescue_model,
            &input,
        );

        let latency_ms = started_at.elapsed().as_millis() as u64;
        log::info!(
            "stream session finalized ({id}) chars={} latency_ms={latency_ms}",
            text.len()
        );
        FinalTranscript { text, latency_ms }
    }

    // -----------------------------------------------------------------------
    // Batch path
    // -----------------------------------------------------------------------

    /// Transcribe a WAV file in one shot on the default model.
    ///
    /// Shares the streaming pipeline's primitives (downmix, resample,
    /// decode) but none of its session machinery.
    pub fn transcribe_wav(&self, path: &Path) -> Result<String, BatchError> {
        if !path.exists() {
            return Err(BatchError::InvalidPath);
        }

        let audio = read_wav_mono(path, self.stream_cfg.model_sample_rate)?;

        log::info!(
            "batch transcribe: {} ({} samples)",
            path.display(),
            audio.len()
        );
        let text = self
            .engine
            .decode(&audio, &self.stt_cfg.language, &self.stt_cfg.model)?;
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(collapse_doubling(&text))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn committed_text(&self, id: &str) -> Option<String> {
        self.store
            .with_session(id, |s| s.committed_text.clone())
            .filter(|text| !text.is_empty())
    }
}

/// Read a WAV file as mono `f32` at `target_rate`.
fn read_wav_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>, BatchError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| BatchError::Wav(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<Result<_, _>>()
            .map_err(|e| BatchError::Wav(e.to_string()))?,
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| BatchError::Wav(e.to_string()))?,
        (format, bits) => {
            return Err(BatchError::Wav(format!(
                "unsupported sample format: {format:?} {bits}-bit"
            )))
        }
    };

    let mono = stereo_to_mono(&samples, spec.channels);
    Ok(resample(&mono, spec.sample_rate, target_rate))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
