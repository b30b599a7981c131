//! LLM module - completion provider integrations
//!
//! Provides the provider abstraction the negotiation engine talks to, with
//! OpenRouter as the production backend.

pub mod models;
pub mod openrouter;
pub mod traits;

pub use models::{group_by_provider, usable_models, ModelInfo, ModelPricing};
pub use openrouter::OpenRouterClient;
pub use traits::{CompletionProvider, GenerateOptions, StreamChunk, StreamResponse};
