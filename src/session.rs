//! Per-session conversation state.
//!
//! A [`ChatSession`] owns the history of one conversation. Each turn borrows
//! it, reads the wire messages, and commits the rendered assistant reply when
//! the stream ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a chat session, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Hidden messages are neither displayed nor sent to the server.
    #[serde(skip)]
    pub hidden: bool,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            hidden: false,
            created_at: Utc::now(),
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

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Conversation history for one user session.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    id: SessionId,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with hidden instructions kept at the head of history.
    pub fn with_preamble(preamble: impl Into<String>) -> Self {
        let mut session = Self::new();
        session
            .history
            .push(ChatMessage::user(preamble).hidden());
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Every message, hidden ones included.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Messages meant for display.
    pub fn visible(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter().filter(|m| !m.hidden)
    }

    /// Messages sent with the next request.
    pub fn wire_messages(&self) -> Vec<ChatMessage> {
        self.visible().cloned().collect()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    /// Record the final rendered form of an assistant turn.
    pub fn commit_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    /// Drop the visible conversation, keeping hidden instructions.
    pub fn clear(&mut self) {
        self.history.retain(|m| m.hidden);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
