//! Idempotent, process-wide model bootstrap.

use crate::{LoadEvent, LoadState, ModelLoadError, ProgressBroadcaster, Subscription};
use llm::{Loader, ProgressSink};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{runtime::Handle, sync::watch};

/// Drives a [`Loader`] at most once and caches the model it produces.
///
/// The load state lives in a watch channel whose only writer is this type;
/// everything else reads snapshots. Progress is published through the shared
/// [`ProgressBroadcaster`]. Clones share the same state.
pub struct EngineLoader<L: Loader> {
    inner: Arc<Shared<L>>,
}

struct Shared<L: Loader> {
    loader: L,
    state: watch::Sender<LoadState<L::Model>>,
    broadcaster: ProgressBroadcaster,
    retry_on_failure: bool,
    attempts: AtomicUsize,
}

impl<L: Loader> EngineLoader<L> {
    /// Create a loader in the `Unloaded` state.
    ///
    /// With `retry_on_failure`, a request arriving after a failed attempt
    /// starts a new one; otherwise `Failed` is permanent.
    pub fn new(loader: L, broadcaster: ProgressBroadcaster, retry_on_failure: bool) -> Self {
        Self {
            inner: Arc::new(Shared {
                loader,
                state: watch::Sender::new(LoadState::Unloaded),
                broadcaster,
                retry_on_failure,
                attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// Resolve with the shared model, loading it if no load has started.
    ///
    /// `on_progress` receives the latest percent immediately and every
    /// subsequent update until the load settles. Concurrent callers share one
    /// underlying load.
    pub async fn ensure_loaded(
        &self,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Result<L::Model, ModelLoadError> {
        let settled = match &*self.inner.state.borrow() {
            LoadState::Ready(model) => Some(Ok(model.clone())),
            LoadState::Failed(err) if !self.inner.retry_on_failure => Some(Err(err.clone())),
            _ => None,
        };
        if let Some(result) = settled {
            if result.is_ok() {
                on_progress(100);
            }
            return result;
        }

        let mut state = self.inner.state.subscribe();
        let _subscription = self.subscribe(move |event| {
            if let LoadEvent::Progress(percent) = event {
                on_progress(*percent);
            }
        });

        let settled = state
            .wait_for(LoadState::is_terminal)
            .await
            .map_err(|_| ModelLoadError::new("model loader was dropped"))?;
        match &*settled {
            LoadState::Ready(model) => Ok(model.clone()),
            LoadState::Failed(err) => Err(err.clone()),
            other => Err(ModelLoadError::new(format!(
                "load settled in unexpected state {}",
                other.label()
            ))),
        }
    }

    /// Register a progress observer and make sure a load is under way.
    ///
    /// The load is started first so a retry clears the previous attempt
    /// before the observer's replay.
    pub fn subscribe(&self, observer: impl Fn(&LoadEvent) + Send + Sync + 'static) -> Subscription {
        let broadcaster = &self.inner.broadcaster;
        broadcaster.exclusive(|| {
            self.start();
            broadcaster.subscribe(observer)
        })
    }

    /// Start a load unless one is running or has settled.
    ///
    /// Returns whether this call started a new attempt.
    pub fn start(&self) -> bool {
        let retry = self.inner.retry_on_failure;
        let broadcaster = &self.inner.broadcaster;
        let started = broadcaster.exclusive(|| {
            let mut retrying = false;
            let started = self.inner.state.send_if_modified(|state| match state {
                LoadState::Unloaded => {
                    *state = LoadState::Loading(0);
                    true
                }
                LoadState::Failed(_) if retry => {
                    retrying = true;
                    *state = LoadState::Loading(0);
                    true
                }
                _ => false,
            });
            if started {
                if retrying {
                    broadcaster.reset();
                }
                let attempt = self.inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!("starting model load (attempt {attempt})");
                broadcaster.publish(LoadEvent::Progress(0));
            }
            started
        });
        if !started {
            return false;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let this = self.clone();
                runtime.spawn(async move { this.run().await });
            }
            Err(_) => self.fail(ModelLoadError::new(
                "no async runtime available to drive the model load",
            )),
        }
        true
    }

    /// Snapshot of the current load state.
    pub fn state(&self) -> LoadState<L::Model> {
        self.inner.state.borrow().clone()
    }

    /// Latest known percent-complete.
    pub fn progress(&self) -> u8 {
        self.inner.state.borrow().percent()
    }

    /// The cached model, if ready.
    pub fn handle(&self) -> Option<L::Model> {
        self.inner.state.borrow().handle().cloned()
    }

    /// Number of load attempts started so far.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// The broadcaster progress is published through.
    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.inner.broadcaster
    }

    async fn run(self) {
        let sink = {
            let this = self.clone();
            ProgressSink::new(move |percent| this.report(percent))
        };
        match self.inner.loader.load(sink).await {
            Ok(model) => self.succeed(model),
            Err(err) => self.fail(ModelLoadError::from(err)),
        }
    }

    fn report(&self, percent: u8) {
        let percent = percent.min(100);
        self.inner.broadcaster.exclusive(|| {
            let changed = self.inner.state.send_if_modified(|state| match state {
                LoadState::Loading(current) if *current != percent => {
                    *current = percent;
                    true
                }
                _ => false,
            });
            if changed {
                self.inner.broadcaster.publish(LoadEvent::Progress(percent));
            }
        });
    }

    // State change and event happen under one lock so a retry cannot start
    // between them and inherit this attempt's outcome.
    fn succeed(&self, model: L::Model) {
        let broadcaster = &self.inner.broadcaster;
        broadcaster.exclusive(|| {
            if self.progress() < 100 {
                broadcaster.publish(LoadEvent::Progress(100));
            }
            self.inner.state.send_replace(LoadState::Ready(model));
            tracing::info!("model loaded");
            broadcaster.publish(LoadEvent::Ready);
        });
    }

    fn fail(&self, err: ModelLoadError) {
        tracing::warn!("{err}");
        let broadcaster = &self.inner.broadcaster;
        broadcaster.exclusive(|| {
            self.inner.state.send_replace(LoadState::Failed(err.clone()));
            broadcaster.publish(LoadEvent::Failed(err));
        });
    }
}

impl<L: Loader> Clone for EngineLoader<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Loader> fmt::Debug for EngineLoader<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLoader")
            .field("state", &self.inner.state.borrow().label())
            .field("attempts", &self.attempts())
            .finish()
    }
}
