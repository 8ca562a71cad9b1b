// src/conversation.rs
//! Turn bookkeeping done by the caller before and after the gateway.

use crate::gateway::{Message, Role};

/// Most recent messages kept (and sent) per conversation.
pub const HISTORY_LIMIT: usize = 16;

pub const SYSTEM_PROMPT: &str = "You are Less, a polite, friendly and clear assistant. \
Explain things simply and objectively. Help with studies, technology, everyday tasks \
and general guidance. Keep the conversation natural and trustworthy.";

/// Ensure the system prompt leads, append the user turn once (if non-blank)
/// and bound the result to [`HISTORY_LIMIT`].
pub fn prepare_turn(mut history: Vec<Message>, user_message: &str) -> Vec<Message> {
    if history.first().map(|m| m.role) != Some(Role::System) {
        history.insert(0, Message::system(SYSTEM_PROMPT));
    }
    let text = user_message.trim();
    if !text.is_empty() {
        history.push(Message::user(text));
    }
    bound(history)
}

/// Append the assistant reply and re-bound.
pub fn record_reply(mut history: Vec<Message>, reply: impl Into<String>) -> Vec<Message> {
    history.push(Message::assistant(reply));
    bound(history)
}

/// Keep the newest messages; a leading system prompt survives trimming.
pub fn bound(mut history: Vec<Message>) -> Vec<Message> {
    if history.len() <= HISTORY_LIMIT {
        return history;
    }
    let pinned = history.first().is_some_and(|m| m.role == Role::System);
    if pinned {
        let excess = history.len() - HISTORY_LIMIT;
        history.drain(1..=excess);
    } else {
        let excess = history.len() - HISTORY_LIMIT;
        history.drain(0..excess);
    }
    history
}
