//! Parley - Two-Agent Plan Negotiation
//!
//! Main entry point for the CLI application.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parley::agent::orchestrator::ROUND_LIMIT_MESSAGE;
use parley::cli::render_event;
use parley::session::reduce;
use parley::transport::encode_stream;
use parley::{
    Config, NegotiationEngine, NegotiationOutcome, NegotiationRequest, Repl, SessionState,
    SessionStatus,
};

/// Parley - two agents negotiate a plan until both agree
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model for agent A (primary proposer)
    #[arg(long, short = 'a')]
    model_a: Option<String>,

    /// Model for agent B (critical reviewer)
    #[arg(long, short = 'b')]
    model_b: Option<String>,

    /// Maximum rounds before giving up
    #[arg(long, short = 'r')]
    max_rounds: Option<usize>,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Print raw `data: <json>` event records instead of rendered text
    #[arg(long, requires = "prompt")]
    sse: bool,

    /// Show parsed turns after each reply
    #[arg(long, short = 'd')]
    debug: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(if args.debug { args.verbose.max(2) } else { args.verbose });

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model_a {
        config.models.agent_a = model.clone();
    }

    if let Some(ref model) = args.model_b {
        config.models.agent_b = model.clone();
    }

    if let Some(rounds) = args.max_rounds {
        config.negotiation.max_rounds = rounds;
    }

    if args.debug {
        config.agent.debug = true;
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        return run_once(config, prompt, args.sse).await;
    }

    // Interactive REPL mode
    let mut repl = Repl::with_config(config)?;
    repl.run().await?;

    Ok(())
}

/// Logs go to stderr so stdout stays clean for the negotiation itself
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={}", level)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(io::stderr),
        )
        .with(filter)
        .init();
}

/// Run one negotiation to completion and exit
async fn run_once(config: Config, prompt: String, sse: bool) -> anyhow::Result<()> {
    let engine = Arc::new(NegotiationEngine::from_config(&config)?);
    let (tx, rx) = mpsc::channel(config.negotiation.channel_capacity.max(1));
    let cancel = CancellationToken::new();

    let request = NegotiationRequest::new(
        prompt.clone(),
        config.models.agent_a.clone(),
        config.models.agent_b.clone(),
    );
    let runner = {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(request, tx, cancel).await })
    };

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut stdout = io::stdout();
    if sse {
        let mut records = encode_stream(rx);
        while let Some(record) = records.next().await {
            stdout.write_all(record.as_bytes())?;
            stdout.flush()?;
        }
    } else {
        let mut rx = rx;
        let mut state = SessionState {
            status: SessionStatus::Planning,
            prompt,
            model_a: config.models.agent_a.clone(),
            model_b: config.models.agent_b.clone(),
            ..Default::default()
        };
        while let Some(event) = rx.recv().await {
            state = reduce(state, &event);
            print!("{}", render_event(&event, &state, config.agent.debug));
            stdout.flush()?;
        }
    }

    let report = runner.await?;
    match report.outcome {
        NegotiationOutcome::Agreed { .. } => Ok(()),
        NegotiationOutcome::Cancelled => Ok(()),
        NegotiationOutcome::Exhausted => bail!(ROUND_LIMIT_MESSAGE),
        NegotiationOutcome::Failed(error) => bail!("Negotiation failed: {}", error),
    }
}
