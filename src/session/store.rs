//! Streaming session state and its concurrent registry.
//!
//! [`StreamSession`] is everything the daemon knows about one in-flight
//! utterance.  [`SessionStore`] owns all live sessions behind a single
//! mutex and is explicitly constructed and passed around as
//! `Arc<SessionStore>` — never ambient global state.
//!
//! # Locking discipline
//!
//! Every read-modify-write of a session (chunk append, cursor advance, text
//! commit) happens inside one [`SessionStore::with_session`] critical
//! section.  The store lock must **never** be held across a decode call —
//! decode latency is measured in seconds and would stall every other
//! session's chunk traffic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

// ---------------------------------------------------------------------------
// StreamSession
// ---------------------------------------------------------------------------

/// Per-utterance streaming state.
///
/// The audio buffer is append-only and spans the whole utterance; it is
/// never truncated, because finalization may decode it in full.
/// `decode_cursor` bounds the *undecided* tail — audio not yet covered by a
/// windowed decode — it is not a consumption cursor.
#[derive(Debug)]
pub struct StreamSession {
    /// Caller-supplied opaque id; the sole lookup key.
    pub id: String,
    /// Sample rate the client ships chunks at (clamped to ≥ 1).
    pub input_sample_rate: u32,
    /// Inference language, fixed at creation.
    pub language: String,
    /// Canonical model id, fixed at creation.
    pub model: String,
    /// Creation time, used for end-to-end latency at finalization.
    pub started_at: Instant,
    /// Normalized samples at the model rate.  Non-decreasing length.
    pub audio: Vec<f32>,
    /// Running reconciled transcript.
    pub committed_text: String,
    /// Start of audio not yet covered by a windowed decode.
    /// Invariant: `decode_cursor <= audio.len()`.
    pub decode_cursor: usize,
    /// When the last partial decode ran; `None` before the first one.
    pub last_decode_at: Option<Instant>,
    /// Buffer length at the last partial decode, for "new audio since"
    /// measurements at finalization.
    pub last_decode_total_samples: usize,
}

impl StreamSession {
    /// Create a fresh session.  `input_sample_rate` is clamped to at least 1
    /// so later rate math cannot divide by zero.
    pub fn new(
        id: impl Into<String>,
        input_sample_rate: u32,
        language: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            input_sample_rate: input_sample_rate.max(1),
            language: language.into(),
            model: model.into(),
            started_at: Instant::now(),
            audio: Vec::new(),
            committed_text: String::new(),
            decode_cursor: 0,
            last_decode_at: None,
            last_decode_total_samples: 0,
        }
    }

    /// Buffered duration in seconds at the given model sample rate.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.audio.len() as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Thread-safe registry of live [`StreamSession`]s, keyed by session id.
///
/// Missing ids are *silent no-ops* throughout: a chunk racing a concurrent
/// stop/dispose must never be treated as a fault.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, StreamSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session`, overwriting any stale entry with the same id.
    pub fn create(&self, session: StreamSession) {
        self.lock().insert(session.id.clone(), session);
    }

    /// Run `f` on the session under the store lock, as one atomic
    /// read-modify-write.  Returns `None` (silently) when the id is absent.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut StreamSession) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }

    /// Remove and return the session, if present.
    pub fn remove(&self, id: &str) -> Option<StreamSession> {
        self.lock().remove(id)
    }

    /// Whether a session with this id is live.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StreamSession>> {
        // Poisoning only marks that a holder panicked; the map itself is
        // still structurally valid.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
