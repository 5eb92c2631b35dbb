//! Transport layer — axum router wiring for the daemon's three surfaces.
//!
//! | Route         | Method | Purpose                                   |
//! |---------------|--------|-------------------------------------------|
//! | `/models`     | GET    | fixed model id listing                    |
//! | `/transcribe` | POST   | single-shot WAV file transcription        |
//! | `/stream`     | GET    | WebSocket upgrade for streaming sessions  |

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;

use crate::stream::StreamService;

pub mod http;
pub mod ws;

pub use ws::{dispatch, ClientMessage, ServerMessage};

/// Shared handler state: the one service instance behind every route.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StreamService>,
}

/// Build the daemon's router.
pub fn router(service: Arc<StreamService>) -> Router {
    Router::new()
        .route("/models", get(http::list_models))
        .route("/transcribe", post(http::transcribe))
        .route("/stream", get(ws::stream_ws))
        .with_state(AppState { service })
}

/// Bind `host:port` and serve until the process is killed.
pub async fn serve(service: Arc<StreamService>, host: &str, port: u16) -> anyhow::Result<()> {
    let app = router(service);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    log::info!("transcription daemon (HTTP + WS) listening on http://{addr}");
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StreamConfig, SttConfig};
    use crate::stt::{MockSttEngine, SttEngine};

    #[test]
    fn router_builds_with_all_routes() {
        let service = Arc::new(StreamService::new(
            Arc::new(MockSttEngine::ok("x")) as Arc<dyn SttEngine>,
            StreamConfig::default(),
            SttConfig::default(),
        ));
        // Building the router exercises route registration; a duplicate or
        // malformed route panics here rather than at serve time.
        let _ = router(service);
    }
}
