//! Shared test fixtures
//!
//! A scripted completion provider that plays back canned replies in call
//! order and records what each call was sent.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use parley::agent::NegotiationSettings;
use parley::core::{Message, ParleyError, Result};
use parley::llm::{CompletionProvider, GenerateOptions, ModelInfo, StreamChunk, StreamResponse};
use parley::NegotiationEngine;

/// What one provider call does
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream the text in small fragments, then finish
    Reply(String),
    /// Fail before streaming with an HTTP status and body
    Reject(u16, String),
    /// Stream the prefix, then fail
    BreakAfter(String, String),
    /// Stream the prefix, then never finish
    Hang(String),
}

/// One recorded provider call
#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Provider replying with each text in turn
    pub fn replies(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Script::Reply(t.to_string())).collect())
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Split text into fragments of at most `size` characters
pub fn fragments(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<StreamResponse> {
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            messages: messages.to_vec(),
        });

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Reject(500, "script exhausted".to_string()));

        match script {
            Script::Reply(text) => {
                let mut chunks: Vec<Result<StreamChunk>> = fragments(&text, 7)
                    .into_iter()
                    .map(|f| Ok(StreamChunk::content(f)))
                    .collect();
                chunks.push(Ok(StreamChunk::done()));
                Ok(Box::pin(futures::stream::iter(chunks)))
            }
            Script::Reject(status, detail) => Err(ParleyError::api(status, detail)),
            Script::BreakAfter(prefix, error) => {
                let chunks = vec![
                    Ok(StreamChunk::content(prefix)),
                    Err(ParleyError::provider(error)),
                ];
                Ok(Box::pin(futures::stream::iter(chunks)))
            }
            Script::Hang(prefix) => {
                let head = futures::stream::iter(vec![Ok(StreamChunk::content(prefix))]);
                Ok(Box::pin(head.chain(futures::stream::pending())))
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Settings with no pause between turns
pub fn fast_settings(max_rounds: usize) -> NegotiationSettings {
    NegotiationSettings {
        max_rounds,
        turn_delay: Duration::ZERO,
        options: GenerateOptions::default(),
    }
}

pub fn engine(provider: Arc<ScriptedProvider>, max_rounds: usize) -> Arc<NegotiationEngine> {
    Arc::new(NegotiationEngine::new(provider, fast_settings(max_rounds)))
}
