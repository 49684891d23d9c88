//! Test utilities for fincopilot-core
//!
//! This module provides a mock OpenAI-compatible chat server that streams
//! server-sent events, for development and integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::sync::oneshot;

/// Model name that makes the mock server answer 500
pub const FAILING_MODEL: &str = "broken-model";

/// Requests received by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub stream: bool,
    pub system: Option<String>,
    pub user: String,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct MockState {
    chunks: Arc<Vec<String>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Mock OpenAI-compatible server for testing and development
pub struct MockChatServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    /// Start the mock server on an available port with the given reply
    pub async fn start(chunks: &[&str]) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            chunks: Arc::new(chunks.iter().map(|c| c.to_string()).collect()),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every chat request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Render chunks as a chat completions SSE body
///
/// The first event is role-only and a finish event precedes `[DONE]`, the way
/// hosted APIs frame their replies.
pub fn sse_body(chunks: &[String]) -> String {
    let mut body = String::new();
    let mut push = |value: serde_json::Value| {
        body.push_str("data: ");
        body.push_str(&value.to_string());
        body.push_str("\n\n");
    };

    push(serde_json::json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"role": "assistant"}}]
    }));
    for chunk in chunks {
        push(serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": chunk}}]
        }));
    }
    push(serde_json::json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    }));

    body.push_str("data: [DONE]\n\n");
    body
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "object": "list",
        "data": [{"id": "mock-model", "object": "model"}]
    }))
}

async fn handle_chat(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.clone());
    let user = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default();

    state.requests.lock().unwrap().push(RecordedRequest {
        model: request.model.clone(),
        stream: request.stream,
        system,
        user,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    if request.model == FAILING_MODEL {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": {"message": "model crashed"}})),
        )
            .into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        sse_body(&state.chunks),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(default)]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}
