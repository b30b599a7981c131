//! Negotiation engine tests
//!
//! Drives the turn loop against a scripted provider and checks the events,
//! agreement rules, round counting and early endings.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use common::{engine, Script, ScriptedProvider};
use parley::agent::orchestrator::{NegotiationReport, ROUND_LIMIT_MESSAGE};
use parley::core::{ActionKind, Message, Party};
use parley::session::{reduce, FailureReason, SessionEvent, SessionState, SessionStatus};
use parley::{NegotiationEngine, NegotiationOutcome, NegotiationRequest};

async fn run_to_end(
    engine: &NegotiationEngine,
    request: NegotiationRequest,
) -> (NegotiationReport, Vec<SessionEvent>) {
    let (tx, mut rx) = mpsc::channel(1024);
    let report = engine.run(request, tx, CancellationToken::new()).await;

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (report, events)
}

fn fold(events: &[SessionEvent]) -> SessionState {
    let start = SessionState {
        status: SessionStatus::Planning,
        ..Default::default()
    };
    events.iter().fold(start, reduce)
}

fn launch_request() -> NegotiationRequest {
    NegotiationRequest::new("Plan a launch", "m1", "m2")
}

#[tokio::test]
async fn test_plan_a_launch_reaches_agreement() {
    let provider = ScriptedProvider::replies(&[
        "<think>ok</think><propose_plan>Launch v1</propose_plan>",
        "<critique>Missing rollback plan</critique>",
        "<propose_plan>Launch v1 with rollback</propose_plan>",
        "<agree>looks complete</agree>",
        "<agree>agreed</agree>",
    ]);
    let engine = engine(provider.clone(), 20);

    let (report, events) = run_to_end(&engine, launch_request()).await;

    assert_eq!(
        report.outcome,
        NegotiationOutcome::Agreed {
            plan: "Launch v1 with rollback".to_string(),
            rounds: 2,
        }
    );
    assert_eq!(report.turns.len(), 5);
    assert!(report.agent_a_agreed && report.agent_b_agreed);

    let state = fold(&events);
    assert_eq!(state.status, SessionStatus::Agreed);
    assert_eq!(state.final_plan.as_deref(), Some("Launch v1 with rollback"));
    assert_eq!(state.rounds, 2);
    assert_eq!(state.turns, report.turns);

    let models: Vec<String> = provider.calls().into_iter().map(|c| c.model).collect();
    assert_eq!(models, vec!["m1", "m2", "m1", "m2", "m1"]);
}

#[tokio::test]
async fn test_each_agent_sees_its_own_view() {
    let provider = ScriptedProvider::replies(&[
        "<propose_plan>Launch v1</propose_plan>",
        "<critique>Missing rollback plan</critique>",
        "<agree>fine</agree>",
        "<agree>fine</agree>",
    ]);
    let engine = engine(provider.clone(), 20);
    run_to_end(&engine, launch_request()).await;

    let calls = provider.calls();
    let b_view = &calls[1].messages;
    assert_eq!(b_view[0].role, "system");
    assert!(b_view[0].content.contains("CRITICAL REVIEWER"));
    assert_eq!(
        b_view[2],
        Message::user("[Agent A]: <propose_plan>Launch v1</propose_plan>")
    );

    let a_view = &calls[2].messages;
    assert_eq!(a_view.len(), 4);
    assert_eq!(a_view[2], Message::assistant("<propose_plan>Launch v1</propose_plan>"));
    assert_eq!(
        a_view[3],
        Message::user("[Agent B]: <critique>Missing rollback plan</critique>")
    );
}

#[tokio::test]
async fn test_events_per_turn_are_ordered() {
    let provider = ScriptedProvider::replies(&[
        "<propose_plan>A fairly long plan body</propose_plan>",
        "<agree>ok</agree>",
        "<agree>ok</agree>",
    ]);
    let engine = engine(provider, 20);
    let (_, events) = run_to_end(&engine, launch_request()).await;

    let mut open: Option<String> = None;
    for event in &events {
        match event {
            SessionEvent::TurnStarted { message_id, .. } => {
                assert!(open.is_none(), "turn started before previous was classified");
                open = Some(message_id.clone());
            }
            SessionEvent::ContentDelta { message_id, .. } => {
                assert_eq!(open.as_ref(), Some(message_id));
            }
            SessionEvent::ActionClassified { message_id, .. } => {
                assert_eq!(open.take().as_ref(), Some(message_id));
            }
            _ => assert!(open.is_none()),
        }
    }

    let ids: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::TurnStarted { message_id, .. } => Some(message_id.as_str()),
            _ => None,
        })
        .collect();
    assert!(ids[0].starts_with("agent-a-"));
    assert!(ids[1].starts_with("agent-b-"));
}

#[tokio::test]
async fn test_non_agreement_resets_the_other_flag() {
    // A agrees, B critiques: A's agreement no longer stands
    let provider = ScriptedProvider::replies(&["<agree>yes</agree>", "<critique>not yet</critique>"]);
    let (report, _) = run_to_end(&engine(provider, 1), launch_request()).await;
    assert_eq!(report.outcome, NegotiationOutcome::Exhausted);
    assert!(!report.agent_a_agreed);
    assert!(!report.agent_b_agreed);

    // A critiques, B agrees: B's own flag stands
    let provider = ScriptedProvider::replies(&["<critique>hmm</critique>", "<agree>fine</agree>"]);
    let (report, _) = run_to_end(&engine(provider, 1), launch_request()).await;
    assert!(!report.agent_a_agreed);
    assert!(report.agent_b_agreed);
}

#[tokio::test]
async fn test_agreement_needs_a_fresh_pair_after_reset() {
    let provider = ScriptedProvider::replies(&[
        "<propose_plan>P</propose_plan>",
        "<agree>ok</agree>",
        "<respond>one more idea</respond>",
        "<critique>then fix it</critique>",
        "<agree>ok</agree>",
        "<agree>ok</agree>",
    ]);
    let (report, events) = run_to_end(&engine(provider.clone(), 20), launch_request()).await;

    assert_eq!(report.plan(), Some("P"));
    assert_eq!(provider.call_count(), 6);

    let actions: Vec<ActionKind> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::ActionClassified { action, .. } => Some(*action),
            _ => None,
        })
        .collect();
    assert_eq!(
        actions,
        vec![
            ActionKind::ProposePlan,
            ActionKind::Agree,
            ActionKind::Respond,
            ActionKind::Critique,
            ActionKind::Agree,
            ActionKind::Agree,
        ]
    );
}

#[tokio::test]
async fn test_rounds_increment_after_each_pair() {
    let provider = ScriptedProvider::replies(&[
        "<propose_plan>1</propose_plan>",
        "<critique>1</critique>",
        "<propose_plan>2</propose_plan>",
        "<critique>2</critique>",
    ]);
    let (report, events) = run_to_end(&engine(provider.clone(), 2), launch_request()).await;

    let rounds: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::RoundCompleted { rounds } => Some(*rounds),
            _ => None,
        })
        .collect();
    assert_eq!(rounds, vec![1, 2]);
    assert_eq!(report.rounds, 2);
    assert_eq!(provider.call_count(), 4);
}

#[tokio::test]
async fn test_round_cap_is_a_distinct_failure() {
    let provider = ScriptedProvider::replies(&[
        "<propose_plan>P</propose_plan>",
        "<critique>no</critique>",
    ]);
    let (report, events) = run_to_end(&engine(provider.clone(), 1), launch_request()).await;

    assert_eq!(report.outcome, NegotiationOutcome::Exhausted);
    assert_eq!(
        events.last(),
        Some(&SessionEvent::Failed {
            error: ROUND_LIMIT_MESSAGE.to_string(),
            reason: FailureReason::RoundLimit,
        })
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::AgreementReached { .. })));

    let state = fold(&events);
    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(state.final_plan, None);
    assert_eq!(state.turns.len(), 2);
}

#[tokio::test]
async fn test_human_intervention_resumes_with_cleared_flags() {
    // First run ends at the cap with B having agreed
    let provider = ScriptedProvider::replies(&["<propose_plan>P1</propose_plan>", "<agree>ok</agree>"]);
    let (first, _) = run_to_end(&engine(provider.clone(), 1), launch_request()).await;
    assert!(first.agent_b_agreed);

    // Resuming needs both agents to agree again
    provider.push(Script::Reply("<agree>with budget</agree>".into()));
    provider.push(Script::Reply("<agree>confirmed</agree>".into()));
    let request = launch_request().resume(first.turns.clone(), "Keep the budget under $10k");
    let (report, events) = run_to_end(&engine(provider.clone(), 5), request).await;

    assert!(matches!(
        &events[0],
        SessionEvent::HumanMessage { content, .. } if content == "Keep the budget under $10k"
    ));
    assert_eq!(provider.call_count(), 4);
    assert_eq!(
        report.outcome,
        NegotiationOutcome::Agreed {
            plan: "P1".to_string(),
            rounds: 1,
        }
    );

    // Agent A speaks first after a human turn and sees the banner
    let calls = provider.calls();
    assert_eq!(calls[2].model, "m1");
    let last = calls[2].messages.last().unwrap();
    assert_eq!(last.role, "user");
    assert!(last.content.contains("[HUMAN INTERVENTION]"));
    assert!(last.content.ends_with("Keep the budget under $10k"));

    assert_eq!(report.turns.len(), 5);
    assert_eq!(report.turns[2].party, Party::Human);
}

#[tokio::test]
async fn test_cancel_mid_stream_keeps_sealed_turns() {
    let provider = ScriptedProvider::new(vec![
        Script::Reply("<propose_plan>P</propose_plan>".into()),
        Script::Reply("<critique>C</critique>".into()),
        Script::Hang("<propose_plan>partial".into()),
    ]);
    let engine = engine(provider.clone(), 20);
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(16);

    let runner = {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(launch_request(), tx, cancel).await })
    };

    let mut events = Vec::new();
    timeout(Duration::from_secs(5), async {
        while let Some(event) = rx.recv().await {
            let partial = matches!(
                &event,
                SessionEvent::ContentDelta { content, .. } if content == "<propose_plan>partial"
            );
            events.push(event);
            if partial {
                break;
            }
        }
    })
    .await
    .expect("hanging turn never streamed");

    cancel.cancel();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let report = timeout(Duration::from_secs(5), runner)
        .await
        .expect("engine did not stop")
        .unwrap();
    assert_eq!(report.outcome, NegotiationOutcome::Cancelled);
    assert_eq!(report.turns.len(), 2);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(events.last(), Some(&SessionEvent::Stopped));

    let state = fold(&events);
    assert_eq!(state.status, SessionStatus::Stopped);
    assert_eq!(state.turns, report.turns);
}

#[tokio::test]
async fn test_cancel_before_classified_event_leaves_turn_unsealed() {
    // "<agree>x</agree>" streams as three fragments, filling a channel of four
    let provider = ScriptedProvider::replies(&["<agree>x</agree>"]);
    let engine = engine(provider, 20);
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(4);

    let runner = {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(launch_request(), tx, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let report = timeout(Duration::from_secs(5), runner)
        .await
        .expect("engine did not stop")
        .unwrap();

    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::ActionClassified { .. })));
    assert_eq!(events.last(), Some(&SessionEvent::Stopped));
    assert_eq!(report.outcome, NegotiationOutcome::Cancelled);
    assert!(report.turns.is_empty());
    assert!(!report.agent_a_agreed);

    let state = fold(&events);
    assert_eq!(state.turns, report.turns);
}

#[tokio::test]
async fn test_provider_rejection_fails_and_keeps_turns() {
    let provider = ScriptedProvider::new(vec![
        Script::Reply("<propose_plan>P</propose_plan>".into()),
        Script::Reject(401, "invalid api key".into()),
    ]);
    let (report, events) = run_to_end(&engine(provider, 20), launch_request()).await;

    assert!(matches!(report.outcome, NegotiationOutcome::Failed(ref e) if e.contains("401")));
    assert_eq!(report.turns.len(), 1);

    match events.last() {
        Some(SessionEvent::Failed { error, reason }) => {
            assert_eq!(*reason, FailureReason::Provider);
            assert!(error.contains("invalid api key"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let state = fold(&events);
    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(state.turns.len(), 1);
}

#[tokio::test]
async fn test_mid_stream_error_drops_partial_turn() {
    let provider = ScriptedProvider::new(vec![Script::BreakAfter(
        "<respond>half".into(),
        "connection reset".into(),
    )]);
    let (report, events) = run_to_end(&engine(provider, 20), launch_request()).await;

    assert!(matches!(report.outcome, NegotiationOutcome::Failed(_)));
    assert!(report.turns.is_empty());
    assert!(fold(&events).turns.is_empty());
}

#[tokio::test]
async fn test_unstructured_reply_counts_as_respond() {
    let provider = ScriptedProvider::replies(&[
        "Sure, here's my take without any tags.",
        "<agree>ok</agree>",
        "<agree>ok</agree>",
    ]);
    let (report, _) = run_to_end(&engine(provider, 20), launch_request()).await;

    assert_eq!(report.turns[0].action, Some(ActionKind::Respond));
    assert_eq!(report.plan(), Some("Plan agreed upon."));
}
