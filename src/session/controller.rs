//! Session controller
//!
//! Owns one negotiation: its projection, the engine task producing events,
//! the event channel and the cancellation token for the current run.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::orchestrator::{NegotiationEngine, NegotiationReport, NegotiationRequest};
use crate::core::{ParleyError, Result};
use crate::session::state::{reduce, SessionState, SessionStatus};
use crate::session::SessionEvent;

/// Handle to an engine task in flight
struct ActiveRun {
    events: mpsc::Receiver<SessionEvent>,
    cancel: CancellationToken,
    task: JoinHandle<NegotiationReport>,
}

/// Control surface for a single negotiation
pub struct NegotiationSession {
    engine: Arc<NegotiationEngine>,
    state: SessionState,
    run: Option<ActiveRun>,
    channel_capacity: usize,
}

impl NegotiationSession {
    pub fn new(engine: Arc<NegotiationEngine>, channel_capacity: usize) -> Self {
        Self {
            engine,
            state: SessionState::default(),
            run: None,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Current projection
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn engine(&self) -> &Arc<NegotiationEngine> {
        &self.engine
    }

    /// Swap the engine used by later runs. A run in flight keeps its own.
    pub fn set_engine(&mut self, engine: Arc<NegotiationEngine>) {
        self.engine = engine;
    }

    /// Whether an engine task is attached
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Record the request and models for the next start
    pub fn configure(
        &mut self,
        prompt: impl Into<String>,
        model_a: impl Into<String>,
        model_b: impl Into<String>,
    ) -> Result<()> {
        if self.state.status == SessionStatus::Planning {
            return self.reject(ParleyError::invalid_state(
                "Cannot reconfigure while a negotiation is running",
            ));
        }
        self.state.prompt = prompt.into();
        self.state.model_a = model_a.into();
        self.state.model_b = model_b.into();
        self.state.status = SessionStatus::Configuring;
        self.state.error = None;
        Ok(())
    }

    /// Begin a fresh negotiation
    pub fn start(&mut self) -> Result<()> {
        if !matches!(
            self.state.status,
            SessionStatus::Idle | SessionStatus::Configuring
        ) {
            return self.reject(ParleyError::invalid_state(format!(
                "Cannot start from {} status",
                self.state.status
            )));
        }
        if self.state.prompt.trim().is_empty() {
            return self.reject(ParleyError::config("Prompt is required"));
        }
        if self.state.model_a.trim().is_empty() || self.state.model_b.trim().is_empty() {
            return self.reject(ParleyError::config("Both models are required"));
        }

        let request = NegotiationRequest::new(
            self.state.prompt.clone(),
            self.state.model_a.clone(),
            self.state.model_b.clone(),
        );

        self.state = SessionState {
            status: SessionStatus::Planning,
            prompt: std::mem::take(&mut self.state.prompt),
            model_a: std::mem::take(&mut self.state.model_a),
            model_b: std::mem::take(&mut self.state.model_b),
            ..Default::default()
        };
        self.spawn(request);
        Ok(())
    }

    /// Interject with human input and resume from the sealed turns.
    ///
    /// Any run still in flight is cancelled and drained first.
    pub async fn intervene(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if !self.state.status.accepts_intervention() {
            return self.reject(ParleyError::invalid_state(format!(
                "Cannot intervene from {} status",
                self.state.status
            )));
        }
        if text.trim().is_empty() {
            return self.reject(ParleyError::config("Intervention text is required"));
        }

        self.halt().await;
        if !self.state.status.accepts_intervention() {
            // The drained run already finished; keep its result and error
            return Err(ParleyError::invalid_state(format!(
                "Negotiation ended with {} status before the intervention",
                self.state.status
            )));
        }

        let request = NegotiationRequest::new(
            self.state.prompt.clone(),
            self.state.model_a.clone(),
            self.state.model_b.clone(),
        )
        .resume(self.state.sealed_turns(), text);

        self.state.status = SessionStatus::Planning;
        self.state.error = None;
        self.spawn(request);
        Ok(())
    }

    /// Cancel the running negotiation. Sealed turns are kept.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state.status != SessionStatus::Planning {
            return self.reject(ParleyError::invalid_state("No negotiation is running"));
        }
        self.halt().await;
        match self.state.status {
            SessionStatus::Planning => {
                self.state = reduce(std::mem::take(&mut self.state), &SessionEvent::Stopped);
                Ok(())
            }
            SessionStatus::Stopped => Ok(()),
            status => Err(ParleyError::invalid_state(format!(
                "Negotiation ended with {} status before it could be stopped",
                status
            ))),
        }
    }

    /// Abandon everything and return to idle
    pub fn reset(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
            run.task.abort();
        }
        self.state = SessionState::default();
    }

    /// Wait for the next event of the current run and fold it in.
    ///
    /// Returns `None` once the run has finished or when nothing is running.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let run = self.run.as_mut()?;
        match run.events.recv().await {
            Some(event) => {
                self.state = reduce(std::mem::take(&mut self.state), &event);
                if event.is_terminal() {
                    self.run = None;
                }
                Some(event)
            }
            None => {
                self.run = None;
                None
            }
        }
    }

    fn spawn(&mut self, request: NegotiationRequest) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cancel = CancellationToken::new();
        let engine = Arc::clone(&self.engine);
        let token = cancel.clone();

        info!(turns = request.history.len(), "Spawning negotiation task");
        let task = tokio::spawn(async move { engine.run(request, tx, token).await });

        self.run = Some(ActiveRun {
            events: rx,
            cancel,
            task,
        });
    }

    /// Cancel the current run and fold whatever it still delivers
    async fn halt(&mut self) {
        let Some(mut run) = self.run.take() else {
            return;
        };
        run.cancel.cancel();
        while let Some(event) = run.events.recv().await {
            debug!(?event, "Draining event after cancel");
            self.state = reduce(std::mem::take(&mut self.state), &event);
        }
        let _ = run.task.await;
    }

    fn reject(&mut self, err: ParleyError) -> Result<()> {
        self.state.error = Some(err.to_string());
        Err(err)
    }
}

impl Drop for NegotiationSession {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
        }
    }
}
