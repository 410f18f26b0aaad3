//! Chat messages

use crate::StreamChunk;
use serde::{Deserialize, Serialize};

/// A message in the chat
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    /// The role of the message
    pub role: Role,

    /// The content of the message
    pub content: String,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new message builder
    pub fn builder(role: Role) -> MessageBuilder {
        MessageBuilder::new(role)
    }
}

/// Accumulates streamed deltas into a single message.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    /// Create a new message builder
    pub fn new(role: Role) -> Self {
        Self {
            message: Message {
                role,
                content: String::new(),
            },
        }
    }

    /// Accept a chunk from the stream, returning whether it carried content.
    pub fn accept(&mut self, chunk: &StreamChunk) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.message.content.push_str(chunk.content());
        true
    }

    /// The content accumulated so far.
    pub fn content(&self) -> &str {
        &self.message.content
    }

    /// Build the message
    pub fn build(self) -> Message {
        self.message
    }
}

/// The role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user role
    #[default]
    User,
    /// The assistant role
    Assistant,
    /// The system role
    System,
}

impl Role {
    /// The wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}
