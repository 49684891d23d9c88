//! Pluggable text-generation backend abstraction
//!
//! # Architecture
//!
//! - `InsightBackend` trait: streaming chat completion plus health/identity
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! The client is built once at startup and handed to whoever needs it; there
//! is no global instance.
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (groq, openai_compatible, mock). Default: groq
//! - `GROQ_API_KEY`: API key (required for groq backend)
//! - `GROQ_MODEL`: Model name (default: llama-3.1-8b-instant)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

mod mock;
mod openai_compatible;
mod sse;

pub use mock::MockBackend;
pub use openai_compatible::{OpenAICompatibleBackend, DEFAULT_GROQ_MODEL, GROQ_BASE_URL};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Lazy sequence of generated text fragments
pub type TextStream = BoxStream<'static, Result<String>>;

/// A single-turn chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: Option<String>,
    pub user: String,
}

impl ChatPrompt {
    pub fn user(text: &str) -> Self {
        Self {
            system: None,
            user: text.to_string(),
        }
    }
}

/// Trait implemented by every text-generation backend
#[async_trait]
pub trait InsightBackend: Send + Sync {
    /// Start a streaming completion; fragments arrive as the backend produces them
    async fn stream_chat(&self, prompt: &ChatPrompt) -> Result<TextStream>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Groq or any other OpenAI-compatible chat completions server
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `groq` (default): Uses GROQ_API_KEY and GROQ_MODEL
    /// - `openai_compatible`: Uses OPENAI_COMPATIBLE_HOST and OPENAI_COMPATIBLE_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "groq".to_string());

        match backend.to_lowercase().as_str() {
            "groq" => OpenAICompatibleBackend::groq_from_env().map(AIClient::OpenAICompatible),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" | "ollama" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to groq");
                OpenAICompatibleBackend::groq_from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str, api_key: Option<&str>) -> Self {
        let backend = match api_key {
            Some(key) => OpenAICompatibleBackend::with_api_key(host, model, key),
            None => OpenAICompatibleBackend::new(host, model),
        };
        AIClient::OpenAICompatible(backend)
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl InsightBackend for AIClient {
    async fn stream_chat(&self, prompt: &ChatPrompt) -> Result<TextStream> {
        match self {
            AIClient::OpenAICompatible(b) => b.stream_chat(prompt).await,
            AIClient::Mock(b) => b.stream_chat(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
