//! Conversation transcript types.
//!
//! A `Conversation` is an append-only ordered sequence of messages. Messages
//! are never mutated once written; the pipeline only ever reads windows off
//! the tail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Append-only message log for one session.
///
/// The inner vec is private so the only write path is `push`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. There is no removal or in-place edit API.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages in transcript order (all of them if fewer).
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// The newest user message within a window, plus the user messages that
/// precede it in the same window. Returns `None` when the window holds no
/// user turn at all.
pub fn split_latest_user(window: &[Message]) -> Option<(&Message, Vec<&Message>)> {
    let latest_idx = window.iter().rposition(|m| m.role == Role::User)?;
    let prior: Vec<&Message> = window[..latest_idx]
        .iter()
        .filter(|m| m.role == Role::User)
        .collect();
    Some((&window[latest_idx], prior))
}
