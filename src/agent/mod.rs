//! Agent module - negotiation loop and conversation management
//!
//! Contains response parsing, agent prompts, the per-agent conversation view
//! and the engine that alternates turns until both agents agree.

pub mod conversation;
pub mod loop_state;
pub mod orchestrator;
pub mod parser;
pub mod prompts;

pub use conversation::build_conversation_messages;
pub use loop_state::NegotiationState;
pub use orchestrator::{
    NegotiationEngine, NegotiationOutcome, NegotiationReport, NegotiationRequest,
    NegotiationSettings,
};
pub use parser::{extract_current_plan, parse_response, ParsedResponse};
