//! OpenRouter client implementation
//!
//! Async HTTP client for the OpenRouter chat completions API with streaming.
//! The streaming body is a sequence of `data: {json}` lines terminated by
//! `data: [DONE]`.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::{Config, Message, ParleyError, RecordBuffer, Result};
use crate::llm::models::{usable_models, ModelInfo};
use crate::llm::traits::{CompletionProvider, GenerateOptions, StreamChunk, StreamResponse};

/// OpenRouter API client
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    referer: String,
    title: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

/// One decoded line of the provider stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderRecord {
    /// Incremental text at `choices[0].delta.content`
    Delta(String),
    /// The `[DONE]` sentinel
    Done,
    /// Anything else: comments, keep-alives, role-only deltas, malformed JSON
    Skip,
}

/// Decode a single provider line.
///
/// Unparseable records are skipped. A well-formed record carrying an
/// `error` object is a provider failure.
pub fn parse_record(line: &str) -> Result<ProviderRecord> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data: ") else {
        return Ok(ProviderRecord::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(ProviderRecord::Done);
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            debug!("Skipping unparseable stream record: {} ({})", data, e);
            return Ok(ProviderRecord::Skip);
        }
    };

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("An error occurred during streaming");
        return Err(ParleyError::provider(message.to_string()));
    }

    match value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(content) if !content.is_empty() => Ok(ProviderRecord::Delta(content.to_string())),
        _ => Ok(ProviderRecord::Skip),
    }
}

struct ChunkState<S> {
    body: Pin<Box<S>>,
    buffer: RecordBuffer,
    pending: VecDeque<Result<StreamChunk>>,
    finished: bool,
}

impl<S> ChunkState<S> {
    fn queue_line(&mut self, line: &str) {
        if self.finished {
            return;
        }
        match parse_record(line) {
            Ok(ProviderRecord::Delta(content)) => {
                self.pending.push_back(Ok(StreamChunk::content(content)))
            }
            Ok(ProviderRecord::Done) => {
                self.pending.push_back(Ok(StreamChunk::done()));
                self.finished = true;
            }
            Ok(ProviderRecord::Skip) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }
}

/// Turn a raw response body into a stream of completion chunks.
///
/// The stream always ends with a `done` chunk unless it failed, even when the
/// body closes without sending `[DONE]`.
pub fn completion_chunks<S, B, E>(body: S) -> StreamResponse
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = ChunkState {
        body: Box::pin(body),
        buffer: RecordBuffer::lines(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for line in state.buffer.push(bytes) {
                        state.queue_line(&line);
                    }
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(ParleyError::provider(format!("Stream error: {}", e))));
                    state.finished = true;
                }
                None => {
                    if let Some(rest) = state.buffer.finish() {
                        state.queue_line(&rest);
                    }
                    if !state.finished {
                        state.pending.push_back(Ok(StreamChunk::done()));
                        state.finished = true;
                    }
                }
            }
        }
    }))
}

impl OpenRouterClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.openrouter.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.openrouter.base_url.trim_end_matches('/').to_string(),
            api_key,
            referer: config.openrouter.referer.clone(),
            title: config.openrouter.title.clone(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
    }

    fn connect_error(&self, e: reqwest::Error) -> ParleyError {
        if e.is_connect() {
            ParleyError::provider(format!("Cannot connect to {}: {}", self.base_url, e))
        } else {
            ParleyError::from(e)
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<StreamResponse> {
        let options = options.unwrap_or_default();
        let request = ChatRequest {
            model,
            messages,
            stream: true,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        debug!(
            model,
            messages = messages.len(),
            temperature = ?request.temperature,
            max_tokens = ?request.max_tokens,
            "Stream request"
        );

        let response = self
            .request(reqwest::Method::POST, "/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, model, "OpenRouter rejected completion request");
            return Err(ParleyError::api(status.as_u16(), error_text));
        }

        Ok(completion_chunks(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .request(reqwest::Method::GET, "/models")
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ParleyError::api(
                status.as_u16(),
                format!("Failed to fetch models: {}", error_text),
            ));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(usable_models(models.data))
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}
