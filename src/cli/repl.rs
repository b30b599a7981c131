//! Interactive REPL for Parley
//!
//! Reads commands from stdin and, while a negotiation runs, renders its
//! events as they arrive. Ctrl+C stops the running negotiation.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::parser::{format_for_display, parse_response};
use crate::agent::NegotiationEngine;
use crate::cli::commands::{handle_command, start_plan, CommandResult};
use crate::core::{Config, Party, Result};
use crate::session::{NegotiationSession, SessionEvent, SessionState, SessionStatus};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    session: NegotiationSession,
}

enum Step {
    Interrupt,
    Event(Option<SessionEvent>),
}

impl Repl {
    /// Create a REPL backed by OpenRouter
    pub fn with_config(config: Config) -> Result<Self> {
        let engine = NegotiationEngine::from_config(&config)?;
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    /// Create a REPL around an existing engine
    pub fn with_engine(config: Config, engine: Arc<NegotiationEngine>) -> Self {
        let session = NegotiationSession::new(engine, config.negotiation.channel_capacity);
        Self { config, session }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("{}> ", prompt_label(self.session.state()));
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            let result = handle_command(input, &mut self.session, &mut self.config).await;
            let result = match result {
                Ok(CommandResult::Continue(text)) => self.continue_with(&text).await,
                other => other,
            };

            match result {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Handled(output)) => println!("{}\n", output),
                Ok(CommandResult::Follow(output)) => {
                    println!("{}\n", output);
                    self.follow().await?;
                }
                Ok(CommandResult::None) | Ok(CommandResult::Continue(_)) => {}
                Err(e) => eprintln!("Error: {}\n", e),
            }
        }

        Ok(())
    }

    /// Plain text starts a negotiation, or interjects into one
    async fn continue_with(&mut self, text: &str) -> Result<CommandResult> {
        if self.session.state().status.accepts_intervention() {
            self.session.intervene(text).await?;
            Ok(CommandResult::Follow(format!("[Human] {}", text)))
        } else {
            start_plan(text, &mut self.session, &self.config)
        }
    }

    /// Render events until the run ends or the user presses Ctrl+C
    async fn follow(&mut self) -> Result<()> {
        let mut stdout = io::stdout();

        loop {
            let step = tokio::select! {
                _ = tokio::signal::ctrl_c() => Step::Interrupt,
                event = self.session.next_event() => Step::Event(event),
            };

            match step {
                Step::Interrupt => {
                    match self.session.stop().await {
                        Ok(()) => println!(
                            "\n\n[Stopped] {} turn(s) kept. Use 'say <message>' to resume.\n",
                            self.session.state().turns.len()
                        ),
                        // The run finished before the interrupt landed
                        Err(_) => {
                            let state = self.session.state();
                            let detail = state
                                .final_plan
                                .as_deref()
                                .or(state.error.as_deref())
                                .unwrap_or_default();
                            println!("\n\n[{}] Nothing left to stop.\n{}\n", state.status, detail);
                        }
                    }
                    return Ok(());
                }
                Step::Event(None) => {
                    println!();
                    return Ok(());
                }
                Step::Event(Some(event)) => {
                    print!("{}", render_event(&event, self.session.state(), self.config.agent.debug));
                    stdout.flush()?;
                    if event.is_terminal() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!(
            r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║   P A R L E Y                                             ║
║                                                           ║
║   Two agents negotiate a plan until both agree            ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#
        );
        println!("Endpoint:   {}", self.config.openrouter.base_url);
        println!("Models:");
        println!("  Agent A: {}", self.config.models.agent_a);
        println!("  Agent B: {}", self.config.models.agent_b);
        println!("Max rounds: {}", self.config.negotiation.max_rounds);
        println!();
        println!("Commands: help, plan, say, stop, status, history, models, exit");
        println!("Ctrl+C stops a running negotiation; type exit or press Ctrl+D to quit");
        println!("───────────────────────────────────────────────────────────");
    }
}

fn prompt_label(state: &SessionState) -> &'static str {
    match state.status {
        SessionStatus::Stopped => "parley (stopped)",
        SessionStatus::Agreed => "parley (agreed)",
        SessionStatus::Error => "parley (error)",
        _ => "parley",
    }
}

/// Text to print for one event, given the projection after folding it
pub fn render_event(event: &SessionEvent, state: &SessionState, debug: bool) -> String {
    match event {
        SessionEvent::TurnStarted { party, .. } => {
            format!("\n── {} ──\n", party.label())
        }
        SessionEvent::ContentDelta { content, .. } => content.clone(),
        SessionEvent::ActionClassified {
            message_id, action, ..
        } => {
            let mut out = format!("\n   → {}\n", action.label());
            if debug {
                if let Some(turn) = state.turns.iter().find(|t| &t.id == message_id) {
                    out.push_str(&format!(
                        "\n{}\n",
                        format_for_display(&parse_response(&turn.content))
                    ));
                }
            }
            out
        }
        SessionEvent::HumanMessage { content, .. } => {
            format!("\n── {} ──\n{}\n", Party::Human.label(), content)
        }
        SessionEvent::RoundCompleted { rounds } => format!("\n[Round {} complete]\n", rounds),
        SessionEvent::AgreementReached { plan, rounds } => format!(
            "\n\n✓ Both agents agreed after {} round(s).\n\nFinal plan:\n{}\n\n",
            rounds, plan
        ),
        SessionEvent::Stopped => "\n\n[Stopped]\n\n".to_string(),
        SessionEvent::Failed { error, reason } => {
            format!("\n\n✗ Negotiation ended ({}): {}\n\n", reason, error)
        }
    }
}
