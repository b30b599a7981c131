//! Events emitted by the negotiation engine

use std::fmt;

use crate::core::{ActionKind, Party};

/// Why a negotiation ended in error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Provider or transport failure
    Provider,
    /// Round cap reached without agreement
    RoundLimit,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Provider => "provider",
            FailureReason::RoundLimit => "round-limit",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "provider" => Some(FailureReason::Provider),
            "round-limit" => Some(FailureReason::RoundLimit),
            _ => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of something that happened in a negotiation.
///
/// For each agent turn the engine emits `TurnStarted`, any number of
/// `ContentDelta`s and exactly one `ActionClassified`, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TurnStarted {
        party: Party,
        message_id: String,
    },
    ContentDelta {
        party: Party,
        message_id: String,
        content: String,
    },
    ActionClassified {
        party: Party,
        message_id: String,
        action: ActionKind,
    },
    HumanMessage {
        message_id: String,
        content: String,
    },
    RoundCompleted {
        rounds: usize,
    },
    AgreementReached {
        plan: String,
        rounds: usize,
    },
    Stopped,
    Failed {
        error: String,
        reason: FailureReason,
    },
}

impl SessionEvent {
    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::AgreementReached { .. } | SessionEvent::Stopped | SessionEvent::Failed { .. }
        )
    }
}
