//! Deterministic engines for exercising the session without a real model.
//!
//! [`ScriptedLoader`] reports a fixed progress script and yields a
//! [`ScriptedModel`], which replies with fixed chunks and records every
//! request it receives.

use anyhow::{Result, bail};
use futures_core::Stream;
use llm::{Loader, Model, ProgressSink, Request, StreamChunk};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;

/// A loader that follows a fixed script.
#[derive(Debug, Clone)]
pub struct ScriptedLoader {
    model: ScriptedModel,
    steps: Vec<u8>,
    failures: usize,
    gate: Option<Arc<Notify>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    /// A loader that succeeds at once with `model`.
    pub fn new(model: ScriptedModel) -> Self {
        Self {
            model,
            steps: Vec::new(),
            failures: 0,
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report these percent values, yielding between each.
    pub fn with_progress(mut self, steps: impl IntoIterator<Item = u8>) -> Self {
        self.steps = steps.into_iter().collect();
        self
    }

    /// Fail the first `attempts` loads.
    pub fn failing(mut self, attempts: usize) -> Self {
        self.failures = attempts;
        self
    }

    /// Hold every load after its progress script until the returned gate
    /// is opened.
    pub fn gated(mut self) -> (Self, Gate) {
        let notify = Arc::new(Notify::new());
        self.gate = Some(notify.clone());
        (self, Gate(notify))
    }

    /// Number of times `load` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Loader for ScriptedLoader {
    type Model = ScriptedModel;

    async fn load(&self, progress: ProgressSink) -> Result<ScriptedModel> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        for step in &self.steps {
            progress.report(*step);
            tokio::task::yield_now().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if attempt <= self.failures {
            bail!("scripted load failure on attempt {attempt}");
        }
        Ok(self.model.clone())
    }
}

/// Releases a gated [`ScriptedLoader`].
#[derive(Debug, Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    /// Let one waiting (or the next) load finish.
    pub fn open(&self) {
        self.0.notify_one();
    }
}

/// A model replying with fixed chunks.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    inner: Arc<ModelScript>,
}

#[derive(Debug)]
struct ModelScript {
    chunks: Vec<String>,
    fail_after: Option<usize>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedModel {
    /// A model whose reply is `chunks`, in order.
    pub fn new<S: Into<String>>(chunks: impl IntoIterator<Item = S>) -> Self {
        Self::build(chunks.into_iter().map(Into::into).collect(), None)
    }

    /// A model that fails after delivering `delivered` chunks.
    pub fn failing_after<S: Into<String>>(
        chunks: impl IntoIterator<Item = S>,
        delivered: usize,
    ) -> Self {
        Self::build(chunks.into_iter().map(Into::into).collect(), Some(delivered))
    }

    fn build(chunks: Vec<String>, fail_after: Option<usize>) -> Self {
        Self {
            inner: Arc::new(ModelScript {
                chunks,
                fail_after,
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Full reply text.
    pub fn reply(&self) -> String {
        self.inner.chunks.concat()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.inner.requests.lock().clone()
    }

    /// Number of completion calls made.
    pub fn calls(&self) -> usize {
        self.inner.requests.lock().len()
    }

    /// Whether both handles refer to the same model.
    pub fn same_as(&self, other: &ScriptedModel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn record(&self, request: &Request) {
        self.inner.requests.lock().push(request.clone());
    }
}

impl Model for ScriptedModel {
    async fn send(&self, request: &Request) -> Result<String> {
        self.record(request);
        if self.inner.fail_after.is_some() {
            bail!("scripted inference failure");
        }
        Ok(self.reply())
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send {
        self.record(&request);
        let script = self.inner.clone();
        async_stream::try_stream! {
            for (i, chunk) in script.chunks.iter().enumerate() {
                if script.fail_after == Some(i) {
                    Err::<(), _>(anyhow::anyhow!("scripted inference failure"))?;
                }
                if request.is_cancelled() {
                    break;
                }
                tokio::task::yield_now().await;
                yield StreamChunk::new(chunk.as_str());
            }
            if script.fail_after.is_some_and(|n| n >= script.chunks.len()) {
                Err::<(), _>(anyhow::anyhow!("scripted inference failure"))?;
            }
        }
    }
}
