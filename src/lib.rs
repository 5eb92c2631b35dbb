//! streamscribe — near-real-time streaming speech-to-text daemon.
//!
//! A client opens the `/stream` WebSocket, pushes base64-wrapped PCM16
//! chunks, and receives incremental `transcript.partial` events followed by
//! exactly one reconciled `transcript.final` per utterance.  Whisper
//! inference is treated as a slow, single-flight resource; everything else
//! in the crate exists to schedule it, stitch its outputs, and fall back
//! gracefully when it yields nothing.
//!
//! # Module map
//!
//! | Module      | Responsibility                                         |
//! |-------------|--------------------------------------------------------|
//! | [`audio`]   | PCM ingestion, resampling, energy gate                 |
//! | [`text`]    | transcript stitching and final polish                  |
//! | [`stt`]     | model registry + the single-flight whisper engine      |
//! | [`session`] | per-utterance state and its concurrent registry        |
//! | [`stream`]  | decode scheduling, finalization chain, orchestration   |
//! | [`server`]  | axum HTTP + WebSocket transport                        |
//! | [`config`]  | TOML settings and platform paths                       |

pub mod audio;
pub mod config;
pub mod server;
pub mod session;
pub mod stream;
pub mod stt;
pub mod text;
