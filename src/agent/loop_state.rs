//! Negotiation loop state
//!
//! Pure bookkeeping for one run of the turn loop: sealed turns, agreement
//! flags, round counter and whose turn it is. The engine drives it; the
//! session reducer applies the same flag rules to its projection.

use crate::core::{ActionKind, Party, Turn};

/// Outcome of recording one sealed agent turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEffect {
    /// Both agents have now agreed
    Agreement,
    /// The negotiation continues
    Continue,
}

/// State of the negotiation loop
#[derive(Debug, Clone)]
pub struct NegotiationState {
    /// Sealed turns in order
    pub turns: Vec<Turn>,
    pub agent_a_agreed: bool,
    pub agent_b_agreed: bool,
    /// Completed A/B exchanges
    pub rounds: usize,
    /// Round cap
    pub max_rounds: usize,
    /// Agent expected to speak next
    pub speaker: Party,
}

impl NegotiationState {
    /// Resume from prior history. Rounds are derived from its length.
    pub fn resume(history: Vec<Turn>, max_rounds: usize) -> Self {
        let rounds = history.len() / 2;
        let speaker = next_speaker(&history);
        Self {
            turns: history,
            agent_a_agreed: false,
            agent_b_agreed: false,
            rounds,
            max_rounds,
            speaker,
        }
    }

    /// Whether the round cap has been reached
    pub fn exhausted(&self) -> bool {
        self.rounds >= self.max_rounds
    }

    pub fn both_agreed(&self) -> bool {
        self.agent_a_agreed && self.agent_b_agreed
    }

    /// Next position in the turn sequence
    pub fn next_sequence(&self) -> usize {
        self.turns.len()
    }

    /// Append a human interjection. Clears both agreement flags.
    pub fn apply_human(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.agent_a_agreed = false;
        self.agent_b_agreed = false;
        self.speaker = Party::AgentA;
    }

    /// Append a sealed agent turn and apply the agreement rules
    pub fn record_turn(&mut self, turn: Turn) -> TurnEffect {
        let party = turn.party;
        let action = turn.action;
        self.turns.push(turn);

        if let Some(kind) = action {
            apply_flags(&mut self.agent_a_agreed, &mut self.agent_b_agreed, party, kind);
        }

        if self.both_agreed() {
            TurnEffect::Agreement
        } else {
            TurnEffect::Continue
        }
    }

    /// Hand the floor to the other agent. Returns true when a round completed.
    pub fn advance(&mut self) -> bool {
        self.speaker = self.speaker.other();
        if self.speaker == Party::AgentA {
            self.rounds += 1;
            true
        } else {
            false
        }
    }
}

/// Who speaks after the given history
pub fn next_speaker(turns: &[Turn]) -> Party {
    match turns.last().map(|t| t.party) {
        Some(Party::AgentA) => Party::AgentB,
        _ => Party::AgentA,
    }
}

/// Agreement rule shared by the engine and the session reducer.
///
/// `agree` sets the speaker's own flag; any other action clears the other
/// agent's flag and leaves the speaker's untouched.
pub fn apply_flags(agent_a: &mut bool, agent_b: &mut bool, party: Party, kind: ActionKind) {
    let (own, other) = match party {
        Party::AgentA => (agent_a, agent_b),
        Party::AgentB => (agent_b, agent_a),
        Party::Human => return,
    };

    if kind == ActionKind::Agree {
        *own = true;
    } else {
        *other = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(party: Party, kind: ActionKind, seq: usize) -> Turn {
        Turn::agent(format!("t{}", seq), party, format!("<{0}>x</{0}>", kind.tag()), kind, seq)
    }

    #[test]
    fn test_resume_from_empty() {
        let state = NegotiationState::resume(Vec::new(), 20);
        assert_eq!(state.rounds, 0);
        assert_eq!(state.speaker, Party::AgentA);
        assert!(!state.exhausted());
    }

    #[test]
    fn test_resume_derives_rounds_and_speaker() {
        let history = vec![
            turn(Party::AgentA, ActionKind::ProposePlan, 0),
            turn(Party::AgentB, ActionKind::Critique, 1),
            turn(Party::AgentA, ActionKind::ProposePlan, 2),
        ];
        let state = NegotiationState::resume(history, 20);
        assert_eq!(state.rounds, 1);
        assert_eq!(state.speaker, Party::AgentB);
    }

    #[test]
    fn test_next_speaker_after_human() {
        let history = vec![
            turn(Party::AgentA, ActionKind::ProposePlan, 0),
            Turn::human("h", "wait", 1),
        ];
        assert_eq!(next_speaker(&history), Party::AgentA);
        assert_eq!(next_speaker(&history[..1]), Party::AgentB);
    }

    #[test]
    fn test_advance_counts_rounds() {
        let mut state = NegotiationState::resume(Vec::new(), 20);
        assert!(!state.advance());
        assert_eq!(state.speaker, Party::AgentB);
        assert!(state.advance());
        assert_eq!(state.rounds, 1);
        assert_eq!(state.speaker, Party::AgentA);
    }

    #[test]
    fn test_non_agreement_resets_only_other_flag() {
        let (mut a, mut b) = (true, true);
        apply_flags(&mut a, &mut b, Party::AgentA, ActionKind::Critique);
        assert!(a);
        assert!(!b);

        let (mut a, mut b) = (true, true);
        apply_flags(&mut a, &mut b, Party::AgentB, ActionKind::Respond);
        assert!(!a);
        assert!(b);
    }

    #[test]
    fn test_agreement_after_reset() {
        let mut state = NegotiationState::resume(Vec::new(), 20);
        assert_eq!(state.record_turn(turn(Party::AgentA, ActionKind::Agree, 0)), TurnEffect::Continue);
        assert!(state.agent_a_agreed);

        state.record_turn(turn(Party::AgentB, ActionKind::Critique, 1));
        assert!(!state.agent_a_agreed);

        state.record_turn(turn(Party::AgentA, ActionKind::Agree, 2));
        let effect = state.record_turn(turn(Party::AgentB, ActionKind::Agree, 3));
        assert_eq!(effect, TurnEffect::Agreement);
    }

    #[test]
    fn test_human_clears_flags() {
        let mut state = NegotiationState::resume(Vec::new(), 20);
        state.record_turn(turn(Party::AgentA, ActionKind::Agree, 0));
        state.apply_human(Turn::human("h", "reconsider", 1));
        assert!(!state.agent_a_agreed);
        assert!(!state.agent_b_agreed);
        assert_eq!(state.speaker, Party::AgentA);
        assert_eq!(state.next_sequence(), 2);
    }
}
