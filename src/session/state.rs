//! Session projection
//!
//! The consumer-side view of a negotiation, rebuilt by folding engine events
//! through [`reduce`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::loop_state::apply_flags;
use crate::core::Turn;
use crate::session::SessionEvent;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Configuring,
    Planning,
    Agreed,
    Stopped,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Configuring => "configuring",
            SessionStatus::Planning => "planning",
            SessionStatus::Agreed => "agreed",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Error => "error",
        }
    }

    /// Whether a negotiation can be resumed with a human message
    pub fn accepts_intervention(&self) -> bool {
        matches!(self, SessionStatus::Planning | SessionStatus::Stopped)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a negotiation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub prompt: String,
    pub model_a: String,
    pub model_b: String,
    /// Turns in order; the last one may still be streaming
    pub turns: Vec<Turn>,
    /// Id of the turn currently streaming
    pub current_message_id: Option<String>,
    pub agent_a_agreed: bool,
    pub agent_b_agreed: bool,
    pub final_plan: Option<String>,
    pub rounds: usize,
    pub error: Option<String>,
}

impl SessionState {
    /// Turns that have finished streaming
    pub fn sealed_turns(&self) -> Vec<Turn> {
        self.turns.iter().filter(|t| !t.streaming).cloned().collect()
    }

    fn turn_mut(&mut self, id: &str) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    fn drop_unsealed(&mut self) {
        self.turns.retain(|t| !t.streaming);
        self.current_message_id = None;
    }
}

/// Fold one event into the projection
pub fn reduce(mut state: SessionState, event: &SessionEvent) -> SessionState {
    match event {
        SessionEvent::TurnStarted { party, message_id } => {
            let sequence = state.turns.len();
            state
                .turns
                .push(Turn::streaming(message_id.clone(), *party, sequence));
            state.current_message_id = Some(message_id.clone());
        }
        SessionEvent::ContentDelta {
            message_id,
            content,
            ..
        } => {
            if let Some(turn) = state.turn_mut(message_id) {
                turn.content.push_str(content);
            }
        }
        SessionEvent::ActionClassified {
            party,
            message_id,
            action,
        } => {
            if let Some(turn) = state.turn_mut(message_id) {
                turn.action = Some(*action);
                turn.streaming = false;
            }
            if state.current_message_id.as_deref() == Some(message_id.as_str()) {
                state.current_message_id = None;
            }
            apply_flags(
                &mut state.agent_a_agreed,
                &mut state.agent_b_agreed,
                *party,
                *action,
            );
        }
        SessionEvent::HumanMessage {
            message_id,
            content,
        } => {
            let sequence = state.turns.len();
            state
                .turns
                .push(Turn::human(message_id.clone(), content.clone(), sequence));
            state.agent_a_agreed = false;
            state.agent_b_agreed = false;
        }
        SessionEvent::RoundCompleted { rounds } => {
            state.rounds = *rounds;
        }
        SessionEvent::AgreementReached { plan, rounds } => {
            state.status = SessionStatus::Agreed;
            state.final_plan = Some(plan.clone());
            state.agent_a_agreed = true;
            state.agent_b_agreed = true;
            state.rounds = *rounds;
            state.current_message_id = None;
        }
        SessionEvent::Stopped => {
            state.status = SessionStatus::Stopped;
            state.drop_unsealed();
        }
        SessionEvent::Failed { error, .. } => {
            state.status = SessionStatus::Error;
            state.error = Some(error.clone());
            state.drop_unsealed();
        }
    }
    state
}
