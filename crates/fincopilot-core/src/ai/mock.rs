//! Mock backend for testing
//!
//! Streams a canned reply without touching the network and remembers the
//! last prompt it was given.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{Error, Result};

use super::{ChatPrompt, InsightBackend, TextStream};

const DEFAULT_CHUNKS: &[&str] = &[
    "You saved ",
    "a healthy share of your income. ",
    "Keep an emergency fund of at least ₹50,000.",
];

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    chunks: Vec<String>,
    /// Yield an error after the canned chunks
    fail_after: bool,
    last_prompt: Arc<Mutex<Option<ChatPrompt>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self::with_chunks(DEFAULT_CHUNKS)
    }

    /// Stream exactly these fragments
    pub fn with_chunks(chunks: &[&str]) -> Self {
        Self {
            healthy: true,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_after: false,
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Stream the chunks, then fail mid-stream
    pub fn failing_after(chunks: &[&str]) -> Self {
        Self {
            fail_after: true,
            ..Self::with_chunks(chunks)
        }
    }

    /// The most recent prompt passed to `stream_chat`
    pub fn last_prompt(&self) -> Option<ChatPrompt> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl InsightBackend for MockBackend {
    async fn stream_chat(&self, prompt: &ChatPrompt) -> Result<TextStream> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.clone());
        }

        if !self.healthy {
            return Err(Error::Ai("mock backend is unavailable".into()));
        }

        let mut items: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_after {
            items.push(Err(Error::Ai("mock stream interrupted".into())));
        }
        Ok(stream::iter(items).boxed())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
