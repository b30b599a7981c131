//! Parley - Two-Agent Plan Negotiation
//!
//! Two language-model agents, a primary proposer and a critical reviewer,
//! take turns refining a plan for a request until both explicitly agree.
//! A human can interject at any point and the loop resumes from the turns
//! exchanged so far.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, error handling and record framing
//! - **LLM**: Completion provider abstraction with an OpenRouter implementation
//! - **Agent**: Response parsing, prompts and the negotiation engine
//! - **Session**: Event model, projection reducer and session controller
//! - **Transport**: `data: <json>` event stream encoding and decoding
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parley::{Config, NegotiationEngine, NegotiationSession};
//!
//! #[tokio::main]
//! async fn main() -> parley::Result<()> {
//!     let config = Config::load();
//!     let engine = Arc::new(NegotiationEngine::from_config(&config)?);
//!     let mut session = NegotiationSession::new(engine, 64);
//!
//!     session.configure("Plan a product launch", "anthropic/claude-3-opus", "openai/gpt-4o")?;
//!     session.start()?;
//!     while let Some(event) = session.next_event().await {
//!         println!("{:?}", event);
//!     }
//!     println!("{:?}", session.state().final_plan);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod session;
pub mod transport;

// Re-export commonly used items
pub use agent::{NegotiationEngine, NegotiationOutcome, NegotiationRequest, NegotiationSettings};
pub use cli::Repl;
pub use core::{Config, ParleyError, Result};
pub use session::{NegotiationSession, SessionEvent, SessionState, SessionStatus};
