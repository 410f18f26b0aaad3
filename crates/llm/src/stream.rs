//! Streaming response abstractions

use compact_str::CompactString;

/// One incremental delta of assistant output.
///
/// A completion stream yields these in generation order; concatenating every
/// chunk of a stream gives the full reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    content: CompactString,
}

impl StreamChunk {
    /// Create a chunk carrying the given delta text.
    pub fn new(content: impl Into<CompactString>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// The delta text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the chunk carries no text (e.g. a role-only preamble).
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl From<&str> for StreamChunk {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for StreamChunk {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}
