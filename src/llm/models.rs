//! Model catalogue
//!
//! OpenRouter model entries and the filtering used when listing them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest context window worth negotiating with
pub const MIN_CONTEXT_LENGTH: u64 = 4096;

/// Per-token pricing, as strings the way OpenRouter reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub completion: String,
}

/// A model offered by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier, e.g. `openai/gpt-4o`
    pub id: String,
    /// Human-readable display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Context window in tokens
    #[serde(default)]
    pub context_length: u64,
    #[serde(default)]
    pub pricing: ModelPricing,
}

impl ModelInfo {
    /// Provider prefix of the id (`openai` for `openai/gpt-4o`)
    pub fn provider(&self) -> &str {
        match self.id.split('/').next() {
            Some(prefix) if !prefix.is_empty() && prefix != self.id => prefix,
            _ => "other",
        }
    }
}

/// Keep chat-capable models with a usable context window, sorted by name
pub fn usable_models(models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    let mut models: Vec<ModelInfo> = models
        .into_iter()
        .filter(|m| m.context_length >= MIN_CONTEXT_LENGTH)
        .collect();
    models.sort_by(|a, b| a.name.cmp(&b.name));
    models
}

/// Group models by provider prefix, preserving order within each group
pub fn group_by_provider(models: &[ModelInfo]) -> BTreeMap<String, Vec<ModelInfo>> {
    let mut grouped: BTreeMap<String, Vec<ModelInfo>> = BTreeMap::new();
    for model in models {
        grouped
            .entry(model.provider().to_string())
            .or_default()
            .push(model.clone());
    }
    grouped
}
