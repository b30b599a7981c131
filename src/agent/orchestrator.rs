//! Negotiation engine
//!
//! Drives the alternating turn loop between agent A and agent B: assemble the
//! speaker's view of the conversation, stream a completion, relay fragments as
//! events, classify the finished turn and apply the agreement rules until both
//! agents agree, the round cap is hit, the provider fails or the run is
//! cancelled. Nothing is raised to the caller; every ending is an event.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::conversation::build_conversation_messages;
use crate::agent::loop_state::{NegotiationState, TurnEffect};
use crate::agent::parser::{extract_current_plan, parse_response};
use crate::core::{message_id, Config, ParleyError, Party, Result, Turn};
use crate::llm::{CompletionProvider, GenerateOptions, OpenRouterClient};
use crate::session::{FailureReason, SessionEvent};

/// Plan reported when both agents agree before anyone proposed one
pub const FALLBACK_PLAN: &str = "Plan agreed upon.";

/// Failure message for an exhausted negotiation
pub const ROUND_LIMIT_MESSAGE: &str = "Maximum rounds reached without agreement";

/// Tunables for the turn loop
#[derive(Debug, Clone)]
pub struct NegotiationSettings {
    pub max_rounds: usize,
    /// Pause between turns; zero disables it
    pub turn_delay: Duration,
    pub options: GenerateOptions,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            turn_delay: Duration::from_millis(500),
            options: GenerateOptions {
                temperature: Some(0.7),
                max_tokens: Some(4096),
            },
        }
    }
}

impl NegotiationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_rounds: config.negotiation.max_rounds,
            turn_delay: config.turn_delay(),
            options: GenerateOptions {
                temperature: Some(config.negotiation.temperature),
                max_tokens: Some(config.negotiation.max_tokens),
            },
        }
    }
}

/// Input for one run of the loop
#[derive(Debug, Clone, Default)]
pub struct NegotiationRequest {
    pub prompt: String,
    pub model_a: String,
    pub model_b: String,
    /// Sealed turns from an earlier run, empty for a fresh negotiation
    pub history: Vec<Turn>,
    /// Human interjection to append before resuming
    pub human_input: Option<String>,
}

impl NegotiationRequest {
    pub fn new(
        prompt: impl Into<String>,
        model_a: impl Into<String>,
        model_b: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model_a: model_a.into(),
            model_b: model_b.into(),
            history: Vec::new(),
            human_input: None,
        }
    }

    /// Resume from prior turns with a human interjection
    pub fn resume(mut self, history: Vec<Turn>, human_input: impl Into<String>) -> Self {
        self.history = history;
        self.human_input = Some(human_input.into());
        self
    }

    fn model_for(&self, party: Party) -> &str {
        match party {
            Party::AgentB => &self.model_b,
            _ => &self.model_a,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    Agreed { plan: String, rounds: usize },
    /// Round cap reached
    Exhausted,
    Failed(String),
    Cancelled,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct NegotiationReport {
    pub outcome: NegotiationOutcome,
    /// Sealed turns, including any supplied history
    pub turns: Vec<Turn>,
    pub rounds: usize,
    pub agent_a_agreed: bool,
    pub agent_b_agreed: bool,
}

impl NegotiationReport {
    /// The agreed plan, if any
    pub fn plan(&self) -> Option<&str> {
        match &self.outcome {
            NegotiationOutcome::Agreed { plan, .. } => Some(plan),
            _ => None,
        }
    }
}

/// Why the loop left early
enum Halt {
    Cancelled,
    Failed(ParleyError),
}

impl From<ParleyError> for Halt {
    fn from(err: ParleyError) -> Self {
        Halt::Failed(err)
    }
}

/// Event sink that gives up as soon as the run is cancelled
struct Emitter<'a> {
    events: &'a mpsc::Sender<SessionEvent>,
    cancel: &'a CancellationToken,
}

impl Emitter<'_> {
    async fn emit(&self, event: SessionEvent) -> std::result::Result<(), Halt> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            sent = self.events.send(event) => sent.map_err(|_| Halt::Cancelled),
        }
    }
}

/// Runs negotiations against a completion provider
pub struct NegotiationEngine {
    provider: Arc<dyn CompletionProvider>,
    settings: NegotiationSettings,
}

impl NegotiationEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: NegotiationSettings) -> Self {
        Self { provider, settings }
    }

    /// Engine backed by OpenRouter with settings from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OpenRouterClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            NegotiationSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &NegotiationSettings {
        &self.settings
    }

    pub fn provider(&self) -> Arc<dyn CompletionProvider> {
        Arc::clone(&self.provider)
    }

    /// Run the turn loop until it ends, reporting progress on `events`.
    ///
    /// Cancellation is observed at every await point. A dropped receiver is
    /// treated the same as cancellation. Consumers must keep reading (or drop
    /// the receiver) after cancelling so the final `Stopped` can be delivered.
    pub async fn run(
        &self,
        request: NegotiationRequest,
        events: mpsc::Sender<SessionEvent>,
        cancel: CancellationToken,
    ) -> NegotiationReport {
        let mut state = NegotiationState::resume(request.history.clone(), self.settings.max_rounds);
        let emitter = Emitter {
            events: &events,
            cancel: &cancel,
        };

        info!(
            model_a = %request.model_a,
            model_b = %request.model_b,
            resumed_turns = state.turns.len(),
            "Starting negotiation"
        );

        let outcome = match self.drive(&request, &mut state, &emitter).await {
            Ok(outcome) => outcome,
            Err(Halt::Cancelled) => {
                info!(turns = state.turns.len(), "Negotiation stopped");
                let _ = events.send(SessionEvent::Stopped).await;
                NegotiationOutcome::Cancelled
            }
            Err(Halt::Failed(err)) => {
                warn!(error = %err, "Negotiation failed");
                let message = err.to_string();
                let _ = events
                    .send(SessionEvent::Failed {
                        error: message.clone(),
                        reason: FailureReason::Provider,
                    })
                    .await;
                NegotiationOutcome::Failed(message)
            }
        };

        NegotiationReport {
            outcome,
            rounds: state.rounds,
            agent_a_agreed: state.agent_a_agreed,
            agent_b_agreed: state.agent_b_agreed,
            turns: state.turns,
        }
    }

    async fn drive(
        &self,
        request: &NegotiationRequest,
        state: &mut NegotiationState,
        emitter: &Emitter<'_>,
    ) -> std::result::Result<NegotiationOutcome, Halt> {
        if let Some(ref text) = request.human_input {
            let id = message_id(Party::Human);
            let turn = Turn::human(id.clone(), text.clone(), state.next_sequence());
            state.apply_human(turn);
            emitter
                .emit(SessionEvent::HumanMessage {
                    message_id: id,
                    content: text.clone(),
                })
                .await?;
        }

        loop {
            if state.exhausted() {
                warn!(rounds = state.rounds, "Round limit reached");
                emitter
                    .emit(SessionEvent::Failed {
                        error: ROUND_LIMIT_MESSAGE.to_string(),
                        reason: FailureReason::RoundLimit,
                    })
                    .await?;
                return Ok(NegotiationOutcome::Exhausted);
            }

            let speaker = state.speaker;
            let id = message_id(speaker);
            debug!(party = %speaker, message_id = %id, rounds = state.rounds, "Turn started");
            emitter
                .emit(SessionEvent::TurnStarted {
                    party: speaker,
                    message_id: id.clone(),
                })
                .await?;

            let content = self
                .stream_turn(request, &state.turns, speaker, &id, emitter)
                .await?;

            let parsed = parse_response(&content);
            let action = parsed.action.kind;
            debug!(party = %speaker, action = %action, "Turn classified");

            // Only turns the consumer saw sealed go into the record
            let turn = Turn::agent(id.clone(), speaker, content, action, state.next_sequence());
            emitter
                .emit(SessionEvent::ActionClassified {
                    party: speaker,
                    message_id: id,
                    action,
                })
                .await?;
            let effect = state.record_turn(turn);

            if effect == TurnEffect::Agreement {
                let plan = extract_current_plan(&state.turns)
                    .unwrap_or_else(|| FALLBACK_PLAN.to_string());
                info!(rounds = state.rounds, "Agreement reached");
                emitter
                    .emit(SessionEvent::AgreementReached {
                        plan: plan.clone(),
                        rounds: state.rounds,
                    })
                    .await?;
                return Ok(NegotiationOutcome::Agreed {
                    plan,
                    rounds: state.rounds,
                });
            }

            if state.advance() {
                emitter
                    .emit(SessionEvent::RoundCompleted {
                        rounds: state.rounds,
                    })
                    .await?;
            }

            self.pause(emitter.cancel).await?;
        }
    }

    /// Stream one completion, relaying each fragment, and return the full text
    async fn stream_turn(
        &self,
        request: &NegotiationRequest,
        turns: &[Turn],
        speaker: Party,
        id: &str,
        emitter: &Emitter<'_>,
    ) -> std::result::Result<String, Halt> {
        let messages = build_conversation_messages(&request.prompt, turns, speaker);
        let model = request.model_for(speaker);
        let options = Some(self.settings.options.clone());

        let mut stream = tokio::select! {
            biased;
            _ = emitter.cancel.cancelled() => return Err(Halt::Cancelled),
            result = self.provider.stream_chat(model, &messages, options) => result?,
        };

        let mut content = String::new();
        loop {
            let item = tokio::select! {
                biased;
                _ = emitter.cancel.cancelled() => return Err(Halt::Cancelled),
                item = stream.next() => item,
            };

            let chunk = match item {
                Some(chunk) => chunk?,
                None => break,
            };

            if !chunk.content.is_empty() {
                content.push_str(&chunk.content);
                emitter
                    .emit(SessionEvent::ContentDelta {
                        party: speaker,
                        message_id: id.to_string(),
                        content: chunk.content,
                    })
                    .await?;
            }
            if chunk.done {
                break;
            }
        }

        Ok(content)
    }

    async fn pause(&self, cancel: &CancellationToken) -> std::result::Result<(), Halt> {
        if self.settings.turn_delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Halt::Cancelled),
            _ = tokio::time::sleep(self.settings.turn_delay) => Ok(()),
        }
    }
}
