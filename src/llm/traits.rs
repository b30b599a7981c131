//! Completion provider trait
//!
//! The negotiation engine only needs "stream text for a message list against a
//! model id". Anything that can do that (OpenRouter, a scripted test double)
//! implements [`CompletionProvider`].

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::core::{Message, Result};
use crate::llm::models::ModelInfo;

/// Options for generation
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// A chunk from a streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    /// Token text content
    pub content: String,
    /// Whether this is the final chunk
    pub done: bool,
}

impl StreamChunk {
    /// Create a new content chunk
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            done: false,
        }
    }

    /// Create a final/done chunk
    pub fn done() -> Self {
        Self {
            content: String::new(),
            done: true,
        }
    }
}

/// Type alias for a boxed stream of chunks
pub type StreamResponse = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Trait for completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streaming completion and hand back the fragment stream.
    ///
    /// Failures before the first byte (bad credentials, HTTP status) are
    /// returned here; failures mid-stream arrive as `Err` items.
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<StreamResponse>;

    /// List models the provider can serve
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
