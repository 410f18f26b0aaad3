//! Chat request type.

use crate::Message;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// A chat completion request.
///
/// Carries the full message history handed to a model together with the
/// cancellation token the caller uses to abandon it. Engines are expected
/// to stop generating once the token is cancelled.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Request {
    /// The conversation messages.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Cancelled when the caller no longer wants output.
    #[serde(skip)]
    pub cancel: CancellationToken,
}

impl Request {
    /// Create a new request over the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token to this request.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether the caller has abandoned this request.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
