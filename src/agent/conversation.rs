//! Conversation assembly
//!
//! Turns the shared negotiation history into the message list one agent sees.
//! The provider only knows system/user/assistant, so the speaker's own turns
//! become `assistant` and everything else becomes `user`.

use crate::agent::prompts::{request_framing, system_prompt, HUMAN_INTERVENTION_BANNER};
use crate::core::{Message, Party, Turn};

/// Build the messages for `speaker`'s next turn
pub fn build_conversation_messages(prompt: &str, turns: &[Turn], speaker: Party) -> Vec<Message> {
    let mut messages = Vec::with_capacity(turns.len() + 2);
    messages.push(Message::system(system_prompt(speaker)));
    messages.push(Message::user(request_framing(prompt)));

    for turn in turns {
        let message = if turn.party == Party::Human {
            Message::user(format!("{}{}", HUMAN_INTERVENTION_BANNER, turn.content))
        } else if turn.party == speaker {
            Message::assistant(turn.content.clone())
        } else {
            Message::user(format!("[{}]: {}", turn.party.label(), turn.content))
        };
        messages.push(message);
    }

    messages
}
