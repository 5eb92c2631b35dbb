//! Daemon settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! The streaming constants in [`StreamConfig`] are tuned values, not derived
//! ones — change them only with measurements in hand.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// HTTP/WebSocket listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.  The daemon is a local companion process, so the
    /// default stays on loopback.
    pub host: String,
    /// TCP port for both the HTTP endpoints and the `/stream` WebSocket.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8111,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper inference backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Default model id (see `stt::model` for the registry).  Requested
    /// session models are canonicalized onto this id.
    pub model: String,
    /// Model id used for the last-resort rescue decode at finalization.
    pub rescue_model: String,
    /// Default ISO-639-1 language for sessions that do not specify one, or
    /// `"auto"` for Whisper's built-in detection.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "whisper-large-v3".into(),
            rescue_model: "whisper-large-v3-turbo".into(),
            language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Rolling-decode profile for streaming sessions.
///
/// | Field | Role |
/// |---|---|
/// | `window_ms` / `overlap_ms`   | partial decode window and retained tail |
/// | `min_decode_interval_ms`     | rate limit between partial decodes |
/// | `vad_rms_threshold`          | strict gate for partial-window decodes |
/// | `vad_rms_relaxed`            | relaxed gate for the finalization tail |
/// | `skip_tail_below_ms`         | new-audio floor under which the tail decode is skipped |
/// | `max_tail_decode_ms`         | cap on the tail decode window |
/// | `full_finalize_max_secs`     | duration ceiling for the full-accuracy final pass |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate the model consumes; all session audio is normalized to
    /// this rate before buffering.
    pub model_sample_rate: u32,
    /// Partial decode window length in milliseconds.
    pub window_ms: u64,
    /// Trailing overlap retained as undecided audio after each decode.
    pub overlap_ms: u64,
    /// Minimum milliseconds between two partial decodes of one session.
    pub min_decode_interval_ms: u64,
    /// RMS threshold a partial window must reach to be decoded.
    pub vad_rms_threshold: f32,
    /// Relaxed RMS threshold for the finalization tail decode.
    pub vad_rms_relaxed: f32,
    /// Below this much new audio since the last decode, finalization skips
    /// the tail decode entirely.
    pub skip_tail_below_ms: u64,
    /// Maximum length of the tail window decoded at finalization.
    pub max_tail_decode_ms: u64,
    /// Utterances at or under this duration get one full-buffer decode as
    /// the final transcript instead of the stitched partials.
    pub full_finalize_max_secs: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            model_sample_rate: 16_000,
            window_ms: 800,
            overlap_ms: 120,
            min_decode_interval_ms: 650,
            vad_rms_threshold: 0.008,
            vad_rms_relaxed: 0.003,
            skip_tail_below_ms: 120,
            max_tail_decode_ms: 2_200,
            full_finalize_max_secs: 30.0,
        }
    }
}

impl StreamConfig {
    /// Milliseconds converted to samples at the model rate.
    pub fn ms_to_samples(&self, ms: u64) -> usize {
        (self.model_sample_rate as u64 * ms / 1_000) as usize
    }

    /// Partial decode window length in samples.
    pub fn window_samples(&self) -> usize {
        self.ms_to_samples(self.window_ms)
    }

    /// Retained overlap tail in samples.
    pub fn overlap_samples(&self) -> usize {
        self.ms_to_samples(self.overlap_ms)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level daemon configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use streamscribe::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Inference backend settings.
    pub stt: SttConfig,
    /// Streaming decode profile.
    pub stream: StreamConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
