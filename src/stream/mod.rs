//! Streaming transcription core — scheduling, finalization, orchestration.
//!
//! # Data flow per session
//!
//! ```text
//! audio.chunk ──▶ StreamService::push_chunk
//!                   ├─ resample to model rate, append to session buffer
//!                   ├─ plan_decode: window ready? rate limit elapsed?
//!                   ├─ energy gate → SttEngine::decode (single-flight)
//!                   └─ merge_transcript → committed text → partial event
//!
//! session.stop ──▶ StreamService::stop_session
//!                   └─ finalize: full pass → tail merge → fallback →
//!                      rescue → punctuate → final event, session disposed
//! ```

pub mod finalize;
pub mod scheduler;
pub mod service;

pub use finalize::{finalize, FinalizeInput};
pub use scheduler::{plan_decode, DecodePlan};
pub use service::{BatchError, FinalTranscript, StreamService};
