//! Shared types used across Parley modules
//!
//! Contains provider messages, negotiation parties, action kinds and turns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A message sent to the completion provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// A participant in the negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// Primary proposer
    #[serde(rename = "agent-a")]
    AgentA,
    /// Critical reviewer
    #[serde(rename = "agent-b")]
    AgentB,
    /// A person interjecting mid-session
    #[serde(rename = "human")]
    Human,
}

impl Party {
    /// Wire name of the party
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::AgentA => "agent-a",
            Party::AgentB => "agent-b",
            Party::Human => "human",
        }
    }

    /// Parse a wire name
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "agent-a" => Some(Party::AgentA),
            "agent-b" => Some(Party::AgentB),
            "human" => Some(Party::Human),
            _ => None,
        }
    }

    /// The opposing agent. Humans have no opponent and map to themselves.
    pub fn other(&self) -> Self {
        match self {
            Party::AgentA => Party::AgentB,
            Party::AgentB => Party::AgentA,
            Party::Human => Party::Human,
        }
    }

    /// Label used when one agent's words are shown to the other
    pub fn label(&self) -> &'static str {
        match self {
            Party::AgentA => "Agent A",
            Party::AgentB => "Agent B",
            Party::Human => "Human",
        }
    }

    pub fn is_agent(&self) -> bool {
        !matches!(self, Party::Human)
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified intent of one agent turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Think,
    ProposePlan,
    Critique,
    AskQuestion,
    Agree,
    Respond,
}

impl ActionKind {
    /// Action tags in the order they are matched. `think` is scanned separately.
    pub const PRIORITY: [ActionKind; 5] = [
        ActionKind::ProposePlan,
        ActionKind::Critique,
        ActionKind::AskQuestion,
        ActionKind::Agree,
        ActionKind::Respond,
    ];

    /// Tag name as it appears in agent text
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::Think => "think",
            ActionKind::ProposePlan => "propose_plan",
            ActionKind::Critique => "critique",
            ActionKind::AskQuestion => "ask_question",
            ActionKind::Agree => "agree",
            ActionKind::Respond => "respond",
        }
    }

    /// Parse a tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "think" => Some(ActionKind::Think),
            "propose_plan" => Some(ActionKind::ProposePlan),
            "critique" => Some(ActionKind::Critique),
            "ask_question" => Some(ActionKind::AskQuestion),
            "agree" => Some(ActionKind::Agree),
            "respond" => Some(ActionKind::Respond),
            _ => None,
        }
    }

    /// Human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Think => "Thinking",
            ActionKind::ProposePlan => "Proposed Plan",
            ActionKind::Critique => "Critique",
            ActionKind::AskQuestion => "Question",
            ActionKind::Agree => "Agreement",
            ActionKind::Respond => "Response",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One party's contribution to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Message id shared by every event of this turn
    pub id: String,
    /// Who produced the turn
    pub party: Party,
    /// Full text content
    pub content: String,
    /// Classified action (agent turns only, once sealed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    /// Position in the session's turn sequence
    pub sequence: usize,
    /// Whether the turn is still receiving content
    #[serde(default)]
    pub streaming: bool,
}

impl Turn {
    /// A sealed agent turn
    pub fn agent(
        id: impl Into<String>,
        party: Party,
        content: impl Into<String>,
        action: ActionKind,
        sequence: usize,
    ) -> Self {
        Self {
            id: id.into(),
            party,
            content: content.into(),
            action: Some(action),
            sequence,
            streaming: false,
        }
    }

    /// A human interjection
    pub fn human(id: impl Into<String>, content: impl Into<String>, sequence: usize) -> Self {
        Self {
            id: id.into(),
            party: Party::Human,
            content: content.into(),
            action: None,
            sequence,
            streaming: false,
        }
    }

    /// An agent turn that has just started streaming
    pub fn streaming(id: impl Into<String>, party: Party, sequence: usize) -> Self {
        Self {
            id: id.into(),
            party,
            content: String::new(),
            action: None,
            sequence,
            streaming: true,
        }
    }
}

/// Generate a message id for a party, e.g. `agent-a-k3j9x0q2m1zt`
pub fn message_id(party: Party) -> String {
    use rand::distr::{Alphanumeric, SampleString};

    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 12);
    format!("{}-{}", party.as_str(), suffix.to_lowercase())
}
