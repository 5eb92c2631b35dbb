//! Core STT engine trait and implementations.
//!
//! # Overview
//!
//! [`SttEngine`] is the seam between the streaming layer and the acoustic
//! model.  It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SttEngine>` and called from any task.
//!
//! [`WhisperEngine`] is the production implementation over
//! `whisper_rs::WhisperContext`.  Contexts are loaded lazily per model id,
//! and **all inference — every session, every model — is serialized behind
//! one mutex**: the backend is a single-flight resource and the rest of the
//! system is built around that constraint.
//!
//! [`MockSttEngine`] (available under `#[cfg(test)]`) records every call and
//! replays scripted responses, so the scheduler and finalization logic can
//! be tested without a GGML model file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::stt::model::{find_model_by_id, ModelPaths};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The requested model id is not in the registry.
    #[error("Unknown model id: {0}")]
    UnknownModel(String),

    /// The GGML model file was not found at the resolved path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the acoustic model.
///
/// # Contract
///
/// - `audio` must be mono `f32` PCM at the configured model sample rate.
/// - `language` is an ISO-639-1 code; `"auto"` or `""` requests built-in
///   language detection.
/// - `model_id` selects a registry model; see [`crate::stt::model`].
/// - Calls may block for hundreds of milliseconds to seconds and are
///   serialized across the whole process — never invoke from an async
///   context without `spawn_blocking`.
/// - The returned text is trimmed; an empty string is a valid result.
pub trait SttEngine: Send + Sync {
    /// Decode `audio` and return the transcript text.
    fn decode(&self, audio: &[f32], language: &str, model_id: &str) -> Result<String, SttError>;
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

/// Number of CPU threads handed to whisper, capped at 8 to avoid
/// diminishing returns.
fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine over `whisper_rs`.
///
/// Construction is cheap and infallible: no context is loaded until the
/// first decode that needs it, so the daemon starts (and serves protocol
/// errors) even when no model file is present yet.  Each loaded
/// `WhisperContext` is kept for the process lifetime.
pub struct WhisperEngine {
    models: ModelPaths,
    /// Lazily loaded contexts, keyed by model id.  The lock is held for the
    /// whole decode call: this is the process-wide single-flight inference
    /// lock, not just a map guard.
    contexts: Mutex<HashMap<String, WhisperContext>>,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl WhisperEngine {
    /// Create an engine resolving GGML files through `models`.
    pub fn new(models: ModelPaths) -> Self {
        Self {
            models,
            contexts: Mutex::new(HashMap::new()),
        }
    }
}

impl SttEngine for WhisperEngine {
    fn decode(&self, audio: &[f32], language: &str, model_id: &str) -> Result<String, SttError> {
        let info = find_model_by_id(model_id)
            .ok_or_else(|| SttError::UnknownModel(model_id.to_string()))?;

        let mut contexts = self
            .contexts
            .lock()
            .map_err(|_| SttError::Transcription("inference lock poisoned".into()))?;

        let ctx = match contexts.entry(info.id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(slot) => {
                let path = self.models.model_path(info);
                if !path.exists() {
                    return Err(SttError::ModelNotFound(path.display().to_string()));
                }
                let path_str = path.to_str().ok_or_else(|| {
                    SttError::ModelNotFound(format!(
                        "model path contains non-UTF-8 characters: {}",
                        path.display()
                    ))
                })?;
                let ctx = WhisperContext::new_with_params(
                    path_str,
                    WhisperContextParameters::default(),
                )
                .map_err(|e| SttError::ContextInit(e.to_string()))?;
                log::info!("whisper context loaded ({}): {}", info.id, path.display());
                slot.insert(ctx)
            }
        };

        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // set_language takes an Option<&str> whose lifetime is tied to fp.
        // The borrow stays valid until state.full() returns.
        let lang: Option<&str> = if language.is_empty() || language == "auto" {
            None
        } else {
            Some(language)
        };
        fp.set_language(lang);
        fp.set_n_threads(optimal_threads());
        fp.set_print_progress(false);
        fp.set_print_realtime(false);

        let mut state = ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        state
            .full(fp, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&seg_text);
        }

        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records every decode call and replays scripted
/// responses, falling back to a fixed default once the script is exhausted.
///
/// # Example
///
/// ```rust,ignore
/// let engine = MockSttEngine::ok("hello world");
/// let text = engine.decode(&vec![0.5f32; 1_600], "en", "whisper-large-v3");
/// assert_eq!(text.unwrap(), "hello world");
/// assert_eq!(engine.call_count(), 1);
/// ```
#[cfg(test)]
pub struct MockSttEngine {
    script: Mutex<std::collections::VecDeque<Result<String, SttError>>>,
    fallback: Result<String, SttError>,
    calls: Mutex<Vec<DecodeCall>>,
}

/// One recorded [`MockSttEngine::decode`] invocation.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct DecodeCall {
    pub samples: usize,
    pub language: String,
    pub model_id: String,
}

#[cfg(test)]
impl MockSttEngine {
    /// A mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(std::collections::VecDeque::new()),
            fallback: Ok(text.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self {
            script: Mutex::new(std::collections::VecDeque::new()),
            fallback: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A mock that replays `script` in order, then keeps returning
    /// `fallback`.
    pub fn scripted(
        script: Vec<Result<String, SttError>>,
        fallback: Result<String, SttError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<DecodeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of decode calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn decode(&self, audio: &[f32], language: &str, model_id: &str) -> Result<String, SttError> {
        self.calls.lock().unwrap().push(DecodeCall {
            samples: audio.len(),
            language: language.to_string(),
            model_id: model_id.to_string(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
