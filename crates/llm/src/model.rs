//! The model capability trait.

use crate::{Request, StreamChunk};
use anyhow::Result;
use futures_core::Stream;

/// A loaded, ready-to-use inference capability.
///
/// Handles are cheap to clone and shared by every feature of the process;
/// clones refer to the same underlying engine.
pub trait Model: Clone + Send + Sync + 'static {
    /// Complete the request in one shot, returning the full reply text.
    fn send(&self, request: &Request) -> impl Future<Output = Result<String>> + Send;

    /// Complete the request incrementally.
    ///
    /// The stream is finite and ordered. It ends early once the request's
    /// cancellation token fires.
    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send;
}
