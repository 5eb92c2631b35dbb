//! Plain HTTP endpoints: model listing and single-shot file transcription.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::stream::BatchError;

use super::AppState;

// ---------------------------------------------------------------------------
// GET /models
// ---------------------------------------------------------------------------

/// The fixed set of model identifiers the daemon can address.
pub async fn list_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "models": state.service.available_models(),
    }))
}

// ---------------------------------------------------------------------------
// POST /transcribe
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    #[serde(default)]
    pub file: Option<String>,
}

/// Transcribe a WAV file named by path in one shot.
pub async fn transcribe(
    State(state): State<AppState>,
    Json(request): Json<TranscribeRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(file) = request.file.filter(|f| !f.is_empty()) else {
        return invalid_path();
    };

    let path = PathBuf::from(file);
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || service.transcribe_wav(&path)).await;

    match result {
        Ok(Ok(text)) => (
            StatusCode::OK,
            Json(json!({"status": "success", "text": text})),
        ),
        Ok(Err(BatchError::InvalidPath)) => invalid_path(),
        Ok(Err(e)) => {
            log::error!("error handling /transcribe request: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "error": e.to_string()})),
            )
        }
        Err(e) => {
            log::error!("/transcribe task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "error": "internal task failure"})),
            )
        }
    }
}

fn invalid_path() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"status": "error", "error": "Invalid file path"})),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StreamConfig, SttConfig};
    use crate::stream::StreamService;
    use crate::stt::{MockSttEngine, SttEngine};

    fn state(engine: MockSttEngine) -> AppState {
        AppState {
            service: Arc::new(StreamService::new(
                Arc::new(engine) as Arc<dyn SttEngine>,
                StreamConfig::default(),
                SttConfig::default(),
            )),
        }
    }

    #[tokio::test]
    async fn models_endpoint_lists_the_default_model() {
        let Json(body) = list_models(State(state(MockSttEngine::ok("x")))).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["models"], json!(["whisper-large-v3"]));
    }

    #[tokio::test]
    async fn transcribe_missing_file_field_is_400() {
        let (status, Json(body)) = transcribe(
            State(state(MockSttEngine::ok("x"))),
            Json(TranscribeRequest { file: None }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Invalid file path");
    }

    #[tokio::test]
    async fn transcribe_nonexistent_path_is_400() {
        let (status, Json(body)) = transcribe(
            State(state(MockSttEngine::ok("x"))),
            Json(TranscribeRequest {
                file: Some("/no/such/file.wav".into()),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid file path");
    }

    #[tokio::test]
    async fn transcribe_valid_wav_returns_text() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("clip.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("wav writer");
        for _ in 0..8_000 {
            writer.write_sample(8_192_i16).expect("sample");
        }
        writer.finalize().expect("finalize wav");

        let (status, Json(body)) = transcribe(
            State(state(MockSttEngine::ok("spoken words"))),
            Json(TranscribeRequest {
                file: Some(path.display().to_string()),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["text"], "spoken words");
    }

    #[tokio::test]
    async fn transcribe_unreadable_wav_is_500() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("not-a-wav.wav");
        std::fs::write(&path, b"definitely not RIFF data").expect("write");

        let (status, Json(body)) = transcribe(
            State(state(MockSttEngine::ok("x"))),
            Json(TranscribeRequest {
                file: Some(path.display().to_string()),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }
}
