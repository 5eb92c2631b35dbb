//! Daemon entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the [`WhisperEngine`] over the platform models directory
//!    (contexts load lazily — startup never blocks on model files).
//! 4. Spawn a background warmup decode of the default model so the first
//!    real utterance does not pay the load cost.
//! 5. Serve HTTP + WebSocket until killed.

use std::sync::Arc;

use streamscribe::config::{AppConfig, AppPaths};
use streamscribe::server;
use streamscribe::stream::StreamService;
use streamscribe::stt::{ModelPaths, SttEngine, WhisperEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("streamscribe daemon starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Inference engine
    let paths = AppPaths::new();
    let engine = Arc::new(WhisperEngine::new(ModelPaths::from_app_paths(&paths)));

    // 4. Background warmup — one decode of silence on the default model.
    //    Failure is logged and ignored; the daemon still serves, and the
    //    finalization chain treats decode errors as empty text.
    {
        let engine: Arc<dyn SttEngine> = Arc::clone(&engine) as Arc<dyn SttEngine>;
        let model = config.stt.model.clone();
        let language = config.stt.language.clone();
        let warmup_samples = config.stream.model_sample_rate as usize;
        tokio::task::spawn_blocking(move || {
            log::info!("warming up whisper model in background...");
            match engine.decode(&vec![0.0_f32; warmup_samples], &language, &model) {
                Ok(_) => log::info!("whisper warmup complete"),
                Err(e) => log::error!("could not preload whisper model: {e}"),
            }
        });
    }

    // 5. Service + transport
    let service = Arc::new(StreamService::new(
        engine as Arc<dyn SttEngine>,
        config.stream.clone(),
        config.stt.clone(),
    ));

    server::serve(service, &config.server.host, config.server.port).await
}
