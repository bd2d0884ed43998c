//! UI-agnostic conversation state types
//!
//! This module contains the data structures shared by every front end:
//! chat messages, the in-memory message store and the document session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    /// Raw text as typed or as returned by the service; rendered at display time.
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Ordered chat turns for the active conversation. Lives only in memory.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Remove the message with `id`, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<ChatMessage> {
        let idx = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(idx))
    }

    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The document session issued by the service on upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub session_id: Option<String>,
    pub doc_name: Option<String>,
}
