//! Live OpenRouter smoke tests
//!
//! Require OPENROUTER_API_KEY and network access. Run with
//! `cargo test --test live_openrouter -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::timeout;

use parley::core::Message;
use parley::llm::{CompletionProvider, OpenRouterClient};
use parley::{Config, NegotiationEngine, NegotiationSession, SessionStatus};

fn live_config() -> Option<Config> {
    let config = Config::load();
    if config.api_key().is_err() {
        println!("OPENROUTER_API_KEY not set, skipping");
        return None;
    }
    Some(config)
}

#[tokio::test]
#[ignore]
async fn test_list_models() {
    let Some(config) = live_config() else { return };
    let client = OpenRouterClient::from_config(&config).unwrap();

    let models = client.list_models().await.unwrap();
    assert!(!models.is_empty());
    assert!(models.iter().all(|m| m.context_length >= 4096));
    assert!(models.windows(2).all(|w| w[0].name <= w[1].name));
}

#[tokio::test]
#[ignore]
async fn test_single_streamed_reply() {
    let Some(config) = live_config() else { return };
    let client = OpenRouterClient::from_config(&config).unwrap();

    let mut stream = client
        .stream_chat(
            &config.models.agent_a,
            &[Message::user("Reply with the single word: ready")],
            None,
        )
        .await
        .unwrap();

    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        content.push_str(&chunk.content);
        if chunk.done {
            break;
        }
    }
    println!("{} -> {}", config.models.agent_a, content);
    assert!(!content.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_short_negotiation() {
    let Some(mut config) = live_config() else { return };
    config.negotiation.max_rounds = 3;
    config.negotiation.turn_delay_ms = 0;

    let engine = Arc::new(NegotiationEngine::from_config(&config).unwrap());
    let mut session = NegotiationSession::new(engine, 64);
    session
        .configure(
            "Plan a 15-minute team stand-up agenda",
            config.models.agent_a.clone(),
            config.models.agent_b.clone(),
        )
        .unwrap();
    session.start().unwrap();

    timeout(Duration::from_secs(600), async {
        while let Some(event) = session.next_event().await {
            println!("{:?}", event);
        }
    })
    .await
    .expect("negotiation timed out");

    let state = session.state();
    println!("status: {}, rounds: {}", state.status, state.rounds);
    assert!(matches!(
        state.status,
        SessionStatus::Agreed | SessionStatus::Error
    ));
    assert!(!state.turns.is_empty());
}
