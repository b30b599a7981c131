//! CLI commands
//!
//! Commands that can be executed in the REPL.

use std::sync::Arc;

use crate::agent::parser::extract_current_plan;
use crate::agent::{NegotiationEngine, NegotiationSettings};
use crate::core::{Config, Result};
use crate::llm::group_by_provider;
use crate::session::NegotiationSession;

/// Result of parsing a command
pub enum CommandResult {
    /// Not a command, treat as a prompt or an interjection
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// A negotiation is running; show output then follow its events
    Follow(String),
    /// Exit the REPL
    Exit,
    /// No output needed
    None,
}

/// Parse and handle REPL commands
pub async fn handle_command(
    input: &str,
    session: &mut NegotiationSession,
    config: &mut Config,
) -> Result<CommandResult> {
    let input = input.trim();
    let (cmd, args) = match input.split_once(' ') {
        Some((cmd, args)) => (cmd.to_lowercase(), args.trim()),
        None => (input.to_lowercase(), ""),
    };

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "plan" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: plan <request>".to_string()));
            }
            start_plan(args, session, config)
        }

        "say" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: say <message>".to_string()));
            }
            session.intervene(args).await?;
            Ok(CommandResult::Follow(format!("[Human] {}", args)))
        }

        "stop" => {
            session.stop().await?;
            Ok(CommandResult::Handled(format!(
                "Negotiation stopped after {} turn(s). Use 'say <message>' to resume.",
                session.state().turns.len()
            )))
        }

        "reset" | "clear" => {
            session.reset();
            Ok(CommandResult::Handled("Session reset.".to_string()))
        }

        "status" => Ok(CommandResult::Handled(status_text(session, config))),

        "history" => Ok(CommandResult::Handled(history_text(session))),

        "current" => {
            let state = session.state();
            let plan = state
                .final_plan
                .clone()
                .or_else(|| extract_current_plan(&state.sealed_turns()));
            Ok(CommandResult::Handled(match plan {
                Some(plan) => format!("Current plan:\n{}", plan),
                None => "No plan has been proposed yet.".to_string(),
            }))
        }

        "models" => {
            let models = session.engine().provider().list_models().await?;
            let mut output = format!("Available models ({}):\n", models.len());
            for (provider, entries) in group_by_provider(&models) {
                output.push_str(&format!("\n{}\n", provider));
                for model in entries {
                    output.push_str(&format!(
                        "  {} ({}k context)\n",
                        model.id,
                        model.context_length / 1024
                    ));
                }
            }
            output.push_str(&format!(
                "\nCurrent:\n  Agent A: {}\n  Agent B: {}",
                config.models.agent_a, config.models.agent_b
            ));
            Ok(CommandResult::Handled(output))
        }

        "set" => handle_set_command(args, session, config),

        "debug" => {
            config.agent.debug = !config.agent.debug;
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if config.agent.debug { "ON" } else { "OFF" }
            )))
        }

        "config" => handle_config_command(args, config),

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Configure and start a fresh negotiation
pub fn start_plan(
    prompt: &str,
    session: &mut NegotiationSession,
    config: &Config,
) -> Result<CommandResult> {
    if session.state().status.accepts_intervention() {
        return Ok(CommandResult::Handled(
            "A negotiation is already in progress. Use 'say' to interject or 'reset' to start over."
                .to_string(),
        ));
    }
    session.reset();
    session.configure(prompt, &config.models.agent_a, &config.models.agent_b)?;
    session.start()?;
    Ok(CommandResult::Follow(format!(
        "Negotiating: {} ⇄ {}",
        config.models.agent_a, config.models.agent_b
    )))
}

/// Handle 'set' subcommands
fn handle_set_command(
    args: &str,
    session: &mut NegotiationSession,
    config: &mut Config,
) -> Result<CommandResult> {
    let (key, value) = match args.split_once(' ') {
        Some((key, value)) => (key.to_lowercase(), value.trim()),
        None => (args.to_lowercase(), ""),
    };

    if key.is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: set <a|b|rounds|delay|debug> <value>\n\
             Examples:\n\
               set a anthropic/claude-3-opus\n\
               set b openai/gpt-4o\n\
               set rounds 10\n\
               set delay 0\n\
               set debug on"
                .to_string(),
        ));
    }

    match key.as_str() {
        "a" | "agent-a" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current agent A model: {}",
                    config.models.agent_a
                )));
            }
            config.models.agent_a = value.to_string();
            Ok(CommandResult::Handled(format!("Agent A model set to: {}", value)))
        }

        "b" | "agent-b" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current agent B model: {}",
                    config.models.agent_b
                )));
            }
            config.models.agent_b = value.to_string();
            Ok(CommandResult::Handled(format!("Agent B model set to: {}", value)))
        }

        "rounds" => match value.parse::<usize>() {
            Ok(rounds) if rounds > 0 => {
                config.negotiation.max_rounds = rounds;
                refresh_engine(session, config);
                Ok(CommandResult::Handled(format!("Maximum rounds set to: {}", rounds)))
            }
            _ => Ok(CommandResult::Handled(
                "Rounds must be a positive number".to_string(),
            )),
        },

        "delay" => match value.parse::<u64>() {
            Ok(ms) => {
                config.negotiation.turn_delay_ms = ms;
                refresh_engine(session, config);
                Ok(CommandResult::Handled(format!("Turn delay set to: {}ms", ms)))
            }
            Err(_) => Ok(CommandResult::Handled(
                "Delay must be a number of milliseconds".to_string(),
            )),
        },

        "debug" => {
            let enabled = matches!(value.to_lowercase().as_str(), "on" | "true" | "1" | "yes");
            config.agent.debug = enabled;
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if enabled { "ON" } else { "OFF" }
            )))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown setting: {}. Available: a, b, rounds, delay, debug",
            key
        ))),
    }
}

/// Handle 'config' subcommands
fn handle_config_command(args: &str, config: &Config) -> Result<CommandResult> {
    match args {
        "save" => {
            let mut to_save = config.clone();
            if std::env::var("OPENROUTER_API_KEY").is_ok() {
                to_save.openrouter.api_key = None;
            }
            let path = to_save.save_and_get_path()?;
            Ok(CommandResult::Handled(format!(
                "Configuration saved to {}",
                path.display()
            )))
        }
        "" | "show" => Ok(CommandResult::Handled(format!(
            "Config file: {}\n\n\
             Agent A:      {}\n\
             Agent B:      {}\n\
             Max rounds:   {}\n\
             Turn delay:   {}ms\n\
             Temperature:  {}\n\
             Max tokens:   {}\n\
             Endpoint:     {}\n\n\
             Use 'config save' to persist, 'config sample' for a template.",
            Config::config_file().display(),
            config.models.agent_a,
            config.models.agent_b,
            config.negotiation.max_rounds,
            config.negotiation.turn_delay_ms,
            config.negotiation.temperature,
            config.negotiation.max_tokens,
            config.openrouter.base_url,
        ))),
        "sample" => Ok(CommandResult::Handled(Config::default_config_toml())),
        other => Ok(CommandResult::Handled(format!(
            "Unknown config action: {}. Available: show, save, sample",
            other
        ))),
    }
}

/// Rebuild the engine so new loop settings apply to the next run
fn refresh_engine(session: &mut NegotiationSession, config: &Config) {
    let engine = NegotiationEngine::new(
        session.engine().provider(),
        NegotiationSettings::from_config(config),
    );
    session.set_engine(Arc::new(engine));
}

fn status_text(session: &NegotiationSession, config: &Config) -> String {
    let state = session.state();
    format!(
        "Parley Status:\n\
         ─────────────────────────────\n\
         Status:       {}\n\
         Agent A:      {}{}\n\
         Agent B:      {}{}\n\
         Rounds:       {}/{}\n\
         Turns:        {}\n\
         Debug:        {}{}",
        state.status,
        if state.model_a.is_empty() { &config.models.agent_a } else { &state.model_a },
        if state.agent_a_agreed { " (agreed)" } else { "" },
        if state.model_b.is_empty() { &config.models.agent_b } else { &state.model_b },
        if state.agent_b_agreed { " (agreed)" } else { "" },
        state.rounds,
        config.negotiation.max_rounds,
        state.turns.len(),
        if config.agent.debug { "on" } else { "off" },
        state
            .error
            .as_ref()
            .map(|e| format!("\nLast error:   {}", e))
            .unwrap_or_default()
    )
}

fn history_text(session: &NegotiationSession) -> String {
    let state = session.state();
    if state.turns.is_empty() {
        return "No turns yet.".to_string();
    }

    let mut output = format!("Request: {}\n", state.prompt);
    for turn in &state.turns {
        let action = turn
            .action
            .map(|a| format!(" [{}]", a.label()))
            .unwrap_or_default();
        output.push_str(&format!(
            "\n#{} {}{}\n{}\n",
            turn.sequence + 1,
            turn.party.label(),
            action,
            turn.content.trim()
        ));
    }
    output
}

/// Generate help text
fn help_text() -> String {
    r#"Parley Commands:
─────────────────────────────────────────────
  help, ?            Show this help message
  exit, quit, q      Exit Parley
  plan <request>     Start a negotiation between agent A and agent B
  say <message>      Interject and resume a running or stopped negotiation
  stop               Stop the current negotiation (resumable with 'say')
  reset, clear       Discard the session
  status             Show the session and configuration
  history            Show every turn so far
  current            Show the latest proposed or agreed plan
  models             List OpenRouter models grouped by provider
  debug              Toggle debug mode
  config [show|save|sample]  Show, persist or print a template config

  set a <model>      Model for agent A (primary proposer)
  set b <model>      Model for agent B (critical reviewer)
  set rounds <n>     Maximum rounds before giving up
  set delay <ms>     Pause between turns
  set debug <on|off> Show parsed turns after each reply

Keyboard Shortcuts:
  Ctrl+C           Stop the running negotiation (it does not exit Parley;
                   after the first negotiation it is ignored at the prompt)
  Ctrl+D           Exit Parley

Tips:
  - Plain text starts a negotiation, or interjects if one is in progress
  - Agreement needs both agents to agree in consecutive turns
─────────────────────────────────────────────"#
        .to_string()
}
