//! Event-stream wire format
//!
//! Each event travels as one `data: <json>\n\n` record where the JSON is
//! `{"type": ..., "data": {...}}`. Types are `thinking` (turn started),
//! `message` (content fragment, human message, or a bare `rounds` count),
//! `tool` (action classified), `agreed`, `stopped` and `error`.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::core::{ActionKind, Party, RecordBuffer};
use crate::session::{FailureReason, SessionEvent};

/// Record prefix on the wire
pub const DATA_PREFIX: &str = "data: ";

/// JSON body of one record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: WireData,
}

/// Payload fields; which are present depends on the event type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WireEvent {
    fn new(kind: &str, data: WireData) -> Self {
        Self {
            kind: kind.to_string(),
            data,
        }
    }
}

impl From<&SessionEvent> for WireEvent {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::TurnStarted { party, message_id } => WireEvent::new(
                "thinking",
                WireData {
                    role: Some(party.as_str().to_string()),
                    message_id: Some(message_id.clone()),
                    ..Default::default()
                },
            ),
            SessionEvent::ContentDelta {
                party,
                message_id,
                content,
            } => WireEvent::new(
                "message",
                WireData {
                    role: Some(party.as_str().to_string()),
                    content: Some(content.clone()),
                    message_id: Some(message_id.clone()),
                    ..Default::default()
                },
            ),
            SessionEvent::HumanMessage {
                message_id,
                content,
            } => WireEvent::new(
                "message",
                WireData {
                    role: Some(Party::Human.as_str().to_string()),
                    content: Some(content.clone()),
                    message_id: Some(message_id.clone()),
                    ..Default::default()
                },
            ),
            SessionEvent::ActionClassified {
                party,
                message_id,
                action,
            } => WireEvent::new(
                "tool",
                WireData {
                    role: Some(party.as_str().to_string()),
                    tool: Some(action.tag().to_string()),
                    message_id: Some(message_id.clone()),
                    ..Default::default()
                },
            ),
            SessionEvent::RoundCompleted { rounds } => WireEvent::new(
                "message",
                WireData {
                    rounds: Some(*rounds),
                    ..Default::default()
                },
            ),
            SessionEvent::AgreementReached { plan, rounds } => WireEvent::new(
                "agreed",
                WireData {
                    plan: Some(plan.clone()),
                    rounds: Some(*rounds),
                    ..Default::default()
                },
            ),
            SessionEvent::Stopped => WireEvent::new("stopped", WireData::default()),
            SessionEvent::Failed { error, reason } => WireEvent::new(
                "error",
                WireData {
                    error: Some(error.clone()),
                    reason: Some(reason.as_str().to_string()),
                    ..Default::default()
                },
            ),
        }
    }
}

impl WireEvent {
    /// Map back to a session event; `None` for anything unrecognised
    pub fn into_event(self) -> Option<SessionEvent> {
        let data = self.data;
        let party = data.role.as_deref().and_then(Party::from_wire);

        match self.kind.as_str() {
            "thinking" => Some(SessionEvent::TurnStarted {
                party: party.filter(Party::is_agent)?,
                message_id: data.message_id?,
            }),
            "message" => match (data.rounds, party) {
                (Some(rounds), None) => Some(SessionEvent::RoundCompleted { rounds }),
                (_, Some(Party::Human)) => Some(SessionEvent::HumanMessage {
                    message_id: data.message_id?,
                    content: data.content?,
                }),
                (_, Some(party)) => Some(SessionEvent::ContentDelta {
                    party,
                    message_id: data.message_id?,
                    content: data.content?,
                }),
                (None, None) => None,
            },
            "tool" => Some(SessionEvent::ActionClassified {
                party: party.filter(Party::is_agent)?,
                message_id: data.message_id?,
                action: ActionKind::from_tag(data.tool.as_deref()?)?,
            }),
            "agreed" => Some(SessionEvent::AgreementReached {
                plan: data.plan?,
                rounds: data.rounds.unwrap_or_default(),
            }),
            "stopped" => Some(SessionEvent::Stopped),
            "error" => Some(SessionEvent::Failed {
                error: data.error.unwrap_or_else(|| "Unknown error".to_string()),
                reason: data
                    .reason
                    .as_deref()
                    .and_then(FailureReason::from_wire)
                    .unwrap_or(FailureReason::Provider),
            }),
            _ => None,
        }
    }
}

/// Encode one event as a complete record
pub fn encode(event: &SessionEvent) -> String {
    let json = serde_json::to_string(&WireEvent::from(event)).unwrap_or_else(|_| {
        r#"{"type":"error","data":{"error":"Unencodable event"}}"#.to_string()
    });
    format!("{}{}\n\n", DATA_PREFIX, json)
}

/// Decode one record (without its trailing blank line).
///
/// Records without the `data: ` prefix, malformed JSON and unknown types are
/// skipped.
pub fn decode_record(record: &str) -> Option<SessionEvent> {
    let payload = record
        .lines()
        .find_map(|line| line.strip_prefix(DATA_PREFIX))?;

    match serde_json::from_str::<WireEvent>(payload) {
        Ok(wire) => wire.into_event(),
        Err(e) => {
            debug!(error = %e, "Skipping malformed event record");
            None
        }
    }
}

/// Incremental decoder for an event stream arriving in arbitrary chunks
#[derive(Debug)]
pub struct EventDecoder {
    buffer: RecordBuffer,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDecoder {
    pub fn new() -> Self {
        Self {
            buffer: RecordBuffer::events(),
        }
    }

    /// Feed a chunk and return every event it completes
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) -> Vec<SessionEvent> {
        self.buffer
            .push(chunk)
            .iter()
            .filter_map(|record| decode_record(record))
            .collect()
    }

    /// Flush a final record that lacked its terminator
    pub fn finish(&mut self) -> Option<SessionEvent> {
        self.buffer.finish().as_deref().and_then(decode_record)
    }
}

/// Encode every event from a channel as wire records
pub fn encode_stream(events: mpsc::Receiver<SessionEvent>) -> impl Stream<Item = String> {
    ReceiverStream::new(events).map(|event| encode(&event))
}
