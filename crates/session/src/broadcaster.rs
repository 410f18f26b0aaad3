//! Fan-out of load progress to every registered observer.

use crate::LoadEvent;
use parking_lot::ReentrantMutex;
use std::{cell::RefCell, collections::BTreeMap, fmt, sync::Arc};

type Observer = Arc<dyn Fn(&LoadEvent) + Send + Sync>;

/// Identifies one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverToken(u64);

/// Registry of progress observers.
///
/// Every event published after an observer registers reaches it. A new
/// observer is immediately replayed the latest known progress and, once the
/// load has settled, its outcome, so late subscribers never sit at a stale
/// value.
///
/// Delivery runs under a reentrant lock: events reach each observer in
/// publish order, and an observer may register or unregister from inside its
/// own callback. Observers must not block.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    inner: Arc<ReentrantMutex<RefCell<Registry>>>,
}

#[derive(Default)]
struct Registry {
    next: u64,
    observers: BTreeMap<u64, Observer>,
    percent: Option<u8>,
    outcome: Option<LoadEvent>,
}

impl Registry {
    fn record(&mut self, event: &LoadEvent) {
        match event {
            LoadEvent::Progress(percent) => self.percent = Some(*percent),
            LoadEvent::Ready => {
                self.percent = Some(100);
                self.outcome = Some(LoadEvent::Ready);
            }
            LoadEvent::Failed(_) => self.outcome = Some(event.clone()),
        }
    }

    fn replay(&self) -> Vec<LoadEvent> {
        self.percent
            .map(LoadEvent::Progress)
            .into_iter()
            .chain(self.outcome.clone())
            .collect()
    }
}

impl ProgressBroadcaster {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, replaying the latest known state to it.
    pub fn register(&self, observer: impl Fn(&LoadEvent) + Send + Sync + 'static) -> ObserverToken {
        let observer: Observer = Arc::new(observer);
        let guard = self.inner.lock();
        let (token, replay) = {
            let mut registry = guard.borrow_mut();
            let id = registry.next;
            registry.next += 1;
            registry.observers.insert(id, observer.clone());
            (ObserverToken(id), registry.replay())
        };
        for event in &replay {
            observer(event);
        }
        token
    }

    /// Register an observer, returning a guard that unregisters on drop.
    pub fn subscribe(&self, observer: impl Fn(&LoadEvent) + Send + Sync + 'static) -> Subscription {
        let token = self.register(observer);
        Subscription {
            broadcaster: Some(self.clone()),
            token,
        }
    }

    /// Remove an observer. Unknown or already removed tokens are ignored.
    pub fn unregister(&self, token: ObserverToken) {
        let guard = self.inner.lock();
        guard.borrow_mut().observers.remove(&token.0);
    }

    /// Deliver `event` to every currently registered observer.
    pub fn publish(&self, event: LoadEvent) {
        let guard = self.inner.lock();
        let observers: Vec<Observer> = {
            let mut registry = guard.borrow_mut();
            registry.record(&event);
            registry.observers.values().cloned().collect()
        };
        tracing::trace!("publishing {event:?} to {} observer(s)", observers.len());
        for observer in observers {
            observer(&event);
        }
    }

    /// Run `f` under the delivery lock. Publishes and registrations from
    /// other threads wait until it returns; publishes from `f` go through.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.lock();
        f()
    }

    /// Forget the recorded progress and outcome before a new load attempt.
    pub fn reset(&self) {
        let guard = self.inner.lock();
        let mut registry = guard.borrow_mut();
        registry.percent = None;
        registry.outcome = None;
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.inner.lock().borrow().observers.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ProgressBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        let registry = guard.borrow();
        f.debug_struct("ProgressBroadcaster")
            .field("observers", &registry.observers.len())
            .field("percent", &registry.percent)
            .field("outcome", &registry.outcome)
            .finish()
    }
}

/// A registered observer that unregisters itself when dropped.
#[must_use = "dropping a Subscription unregisters its observer"]
pub struct Subscription {
    broadcaster: Option<ProgressBroadcaster>,
    token: ObserverToken,
}

impl Subscription {
    /// The token of the underlying registration.
    pub fn token(&self) -> ObserverToken {
        self.token
    }

    /// Unregister now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(broadcaster) = self.broadcaster.take() {
            broadcaster.unregister(self.token);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .finish()
    }
}
