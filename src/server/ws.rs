//! `/stream` WebSocket protocol and message dispatch.
//!
//! Messages are JSON text frames tagged by a `type` field.  Dispatch is a
//! plain synchronous function from one raw frame to a list of replies —
//! the socket loop only does framing, task hopping and writing, so the
//! whole protocol surface is unit-testable without a socket.
//!
//! # Error taxonomy
//!
//! * unparseable frame → `session.error {code: "invalid_json"}`
//! * parseable frame with an unknown `type` → `session.error {code:
//!   "unsupported_type"}`
//! * `session.start` without a `session_id` → `session.error {code:
//!   "missing_session_id"}`
//! * a chunk or stop referencing nothing → no reply at all
//!
//! None of these close the connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::audio::decode_base64;
use crate::stream::StreamService;

use super::AppState;

/// Fixed stability hint attached to every partial transcript.
const PARTIAL_STABILITY: f64 = 0.7;

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// Client → server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "session.start")]
    Start {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default = "default_sample_rate")]
        sample_rate: u32,
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    #[serde(rename = "audio.chunk")]
    Chunk {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        pcm16_base64: String,
    },
    #[serde(rename = "session.stop")]
    Stop {
        #[serde(default)]
        session_id: Option<String>,
    },
}

fn default_sample_rate() -> u32 {
    16_000
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "session.started")]
    Started { session_id: String },
    #[serde(rename = "transcript.partial")]
    Partial {
        session_id: String,
        text: String,
        stability: f64,
    },
    #[serde(rename = "transcript.final")]
    Final {
        session_id: String,
        text: String,
        latency_ms: u64,
    },
    #[serde(rename = "session.error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Handle one raw text frame against the service.
///
/// `active_session` tracks this connection's most recently started session
/// id; a `session.stop` without an explicit id falls back to it.  Blocking:
/// runs decode work inline — the socket loop calls this via
/// `spawn_blocking`.
pub fn dispatch(
    service: &StreamService,
    active_session: &mut Option<String>,
    raw: &str,
) -> Vec<ServerMessage> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => {
            return vec![ServerMessage::error("invalid_json", "Invalid JSON payload")];
        }
    };

    let mtype = value.get("type").and_then(|t| t.as_str()).unwrap_or("");
    if !matches!(mtype, "session.start" | "audio.chunk" | "session.stop") {
        return vec![ServerMessage::error(
            "unsupported_type",
            format!("Unsupported message type: {mtype}"),
        )];
    }

    let message: ClientMessage = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => {
            return vec![ServerMessage::error(
                "invalid_json",
                format!("Invalid payload: {e}"),
            )];
        }
    };

    match message {
        ClientMessage::Start {
            session_id,
            sample_rate,
            language,
            model,
        } => {
            let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
                return vec![ServerMessage::error(
                    "missing_session_id",
                    "session_id is required",
                )];
            };
            service.start_session(
                &session_id,
                sample_rate,
                language.as_deref(),
                model.as_deref(),
            );
            *active_session = Some(session_id.clone());
            vec![ServerMessage::Started { session_id }]
        }

        ClientMessage::Chunk {
            session_id,
            pcm16_base64,
        } => {
            let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
                return Vec::new();
            };
            let pcm = decode_base64(&pcm16_base64);
            match service.push_chunk(&session_id, &pcm) {
                Some(text) => vec![ServerMessage::Partial {
                    session_id,
                    text,
                    stability: PARTIAL_STABILITY,
                }],
                None => Vec::new(),
            }
        }

        ClientMessage::Stop { session_id } => {
            let session_id = session_id
                .filter(|id| !id.is_empty())
                .or_else(|| active_session.clone());
            let Some(session_id) = session_id else {
                return Vec::new();
            };
            let result = service.stop_session(&session_id);
            vec![ServerMessage::Final {
                session_id,
                text: result.text,
                latency_ms: result.latency_ms,
            }]
        }
    }
}

// ---------------------------------------------------------------------------
// Socket loop
// ---------------------------------------------------------------------------

/// Axum handler upgrading `/stream` to a WebSocket.
pub async fn stream_ws(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(state.service, socket))
}

async fn handle_socket(service: Arc<StreamService>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut active_session: Option<String> = None;

    log::info!("ws client connected: /stream");

    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(raw) => {
                // Dispatch blocks on the store and possibly the inference
                // lock — hop off the I/O path so other connections keep
                // flowing.
                let svc = Arc::clone(&service);
                let carried = active_session.take();
                let joined = tokio::task::spawn_blocking(move || {
                    let mut active = carried;
                    let replies = dispatch(&svc, &mut active, &raw);
                    (replies, active)
                })
                .await;

                let replies = match joined {
                    Ok((replies, active)) => {
                        active_session = active;
                        replies
                    }
                    Err(e) => {
                        log::error!("ws dispatch task failed: {e}");
                        Vec::new()
                    }
                };

                for reply in replies {
                    let payload = match serde_json::to_string(&reply) {
                        Ok(p) => p,
                        Err(e) => {
                            log::error!("failed to serialize ws reply: {e}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload)).await.is_err() {
                        log::info!("ws client disconnected mid-send: /stream");
                        return;
                    }
                }
            }
            Message::Close(_) => break,
            Message::Binary(_) => {
                log::warn!("unexpected binary ws frame ignored");
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    log::info!("ws client disconnected: /stream");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
