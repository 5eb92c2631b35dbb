//! STT (speech-to-text) inference backend.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                 SttEngine (trait)                  │
//! │                                                    │
//! │   ┌────────────┐      ┌───────────────┐            │
//! │   │ ModelPaths │      │ WhisperEngine │            │
//! │   │ - resolve  │─────▶│ - contexts    │            │
//! │   │ - exists?  │      │   (lazy, one  │            │
//! │   └────────────┘      │   per model)  │            │
//! │                       └───────┬───────┘            │
//! │                               │  single-flight     │
//! │                               ▼  mutex             │
//! │                     ┌──────────────────┐           │
//! │                     │     decode()     │           │
//! │                     │  audio → text    │           │
//! │                     └──────────────────┘           │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Decode calls from *all* sessions funnel through one lock — the backend is
//! a single-flight resource, and everything upstream (scheduler rate limits,
//! off-I/O-path dispatch) exists to live with that.

pub mod engine;
pub mod model;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{SttEngine, SttError, WhisperEngine};
pub use model::{
    available_models, canonical_model_id, find_model_by_id, ModelInfo, ModelPaths,
    DEFAULT_MODEL_ID, RESCUE_MODEL_ID, STREAM_MODELS,
};

// test-only re-export so stream-layer test modules can import the mock
// without reaching into `engine` directly.
#[cfg(test)]
pub use engine::MockSttEngine;
