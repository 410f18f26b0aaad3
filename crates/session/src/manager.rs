//! `SessionManager`: the entry point features use to reach the model.

use crate::{
    AssistantConfig, EngineLoader, Error, EventSummary, LoadEvent, LoadState, ModelLoadError,
    ProgressBroadcaster, Result, Subscription, prompt, rank,
};
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use llm::{CancellationToken, Loader, Message, Model, Request, StreamChunk};
use std::{
    fmt,
    pin::{Pin, pin},
    sync::Arc,
    task::{Context, Poll},
};

/// Shared access to the assistant model.
///
/// Created once per process and cloned into every feature; clones share the
/// load state, the cached model and the progress observers. Loading starts
/// with the first subscriber and happens at most once.
pub struct SessionManager<L: Loader> {
    engine: EngineLoader<L>,
    config: Arc<AssistantConfig>,
}

impl<L: Loader> SessionManager<L> {
    /// Create a manager over `loader`. Nothing is loaded until the first
    /// subscriber arrives.
    pub fn new(loader: L, config: AssistantConfig) -> Self {
        let engine = EngineLoader::new(loader, ProgressBroadcaster::new(), config.retry_on_failure);
        Self {
            engine,
            config: Arc::new(config),
        }
    }

    /// Subscribe to load events, starting the load if none is under way.
    ///
    /// The observer immediately receives the latest known progress. Dropping
    /// the returned guard unsubscribes.
    pub fn subscribe_progress(
        &self,
        observer: impl Fn(&LoadEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.engine.subscribe(observer)
    }

    /// Resolve with the loaded model, loading it if needed.
    pub async fn ensure_loaded(
        &self,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> std::result::Result<L::Model, ModelLoadError> {
        self.engine.ensure_loaded(on_progress).await
    }

    /// Snapshot of the load state.
    pub fn state(&self) -> LoadState<L::Model> {
        self.engine.state()
    }

    /// Latest known load percent.
    pub fn progress(&self) -> u8 {
        self.engine.progress()
    }

    /// The model, if loaded.
    pub fn handle(&self) -> Option<L::Model> {
        self.engine.handle()
    }

    /// The assistant configuration.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// The underlying engine loader.
    pub fn engine(&self) -> &EngineLoader<L> {
        &self.engine
    }

    /// Stream an assistant reply to `history`.
    ///
    /// Returns [`Error::Unavailable`] at once when the model is not loaded.
    /// The persona message is prepended before the history reaches the
    /// model. Chunks arrive in generation order; an engine failure ends the
    /// stream with one [`Error::ModelInference`] item. Dropping the stream
    /// cancels generation.
    pub fn chat(&self, history: &[Message]) -> Result<ReplyStream> {
        let model = self.handle().ok_or(Error::Unavailable)?;
        let cancel = CancellationToken::new();
        let request = Request::new(prompt::with_persona(&self.config.persona, history))
            .with_cancel(cancel.clone());
        tracing::debug!("chat request with {} message(s)", request.messages.len());

        let stream = async_stream::stream! {
            let mut chunks = pin!(model.stream(request));
            while let Some(next) = chunks.next().await {
                match next {
                    Ok(chunk) => yield Ok(chunk),
                    Err(err) => {
                        tracing::warn!("chat stream failed: {err:#}");
                        yield Err(Error::inference(err));
                        break;
                    }
                }
            }
        };
        Ok(ReplyStream {
            inner: Box::pin(stream),
            cancel,
        })
    }

    /// Rewrite `text` to be clearer, returning the polished text.
    pub async fn polish(&self, text: &str) -> Result<String> {
        self.polish_inner(text, None).await
    }

    /// Rewrite `text`, calling `on_update` with the growing polished text
    /// after every chunk. The last value passed equals the returned text.
    pub async fn polish_live(
        &self,
        text: &str,
        mut on_update: impl FnMut(&str) + Send,
    ) -> Result<String> {
        self.polish_inner(text, Some(&mut on_update)).await
    }

    async fn polish_inner(
        &self,
        text: &str,
        mut on_update: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text to polish is empty"));
        }
        let model = self.handle().ok_or(Error::Unavailable)?;
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        let request = Request::new(vec![Message::system(prompt::polish(text))]).with_cancel(cancel);

        let mut chunks = pin!(model.stream(request));
        let mut polished = String::new();
        let mut reported = 0;
        while let Some(next) = chunks.next().await {
            let chunk = next.map_err(Error::inference)?;
            if chunk.is_empty() {
                continue;
            }
            polished.push_str(chunk.content());
            let current = polished.trim();
            if current.len() > reported {
                reported = current.len();
                if let Some(on_update) = on_update.as_mut() {
                    on_update(current);
                }
            }
        }

        let polished = polished.trim();
        if polished.is_empty() {
            return Err(Error::ModelInference("model returned an empty rewrite".into()));
        }
        Ok(polished.to_owned())
    }

    /// Order `events` by importance, most important first.
    ///
    /// An empty list is returned as is without calling the model.
    pub async fn rank_events(&self, events: &[EventSummary]) -> Result<Vec<CompactString>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.handle().ok_or(Error::Unavailable)?;
        let request = Request::new(vec![Message::system(rank::prompt(events))]);
        let _guard = request.cancel.clone().drop_guard();
        let reply = model.send(&request).await.map_err(Error::inference)?;
        rank::parse(&reply)
    }
}

impl<L: Loader> Clone for SessionManager<L> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<L: Loader> fmt::Debug for SessionManager<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("engine", &self.engine)
            .finish()
    }
}

/// An in-flight chat reply.
///
/// Yields chunks in generation order. Dropping it, or calling
/// [`ReplyStream::cancel`], stops delivery and cancels generation.
pub struct ReplyStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>,
    cancel: CancellationToken,
}

impl ReplyStream {
    /// Stop generation. Already delivered chunks stay delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the reply was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for ReplyStream {
    type Item = Result<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for ReplyStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
