//! Model bootstrap abstractions.

use crate::Model;
use anyhow::Result;
use std::{fmt, sync::Arc};

/// Produces a [`Model`], reporting percent-complete along the way.
///
/// A loader performs the potentially slow download and initialization of
/// model weights. It is driven at most once per session manager unless the
/// manager is configured to retry failed loads.
pub trait Loader: Send + Sync + 'static {
    /// The model handle this loader produces.
    type Model: Model;

    /// Load the model, reporting progress through `progress`.
    fn load(&self, progress: ProgressSink) -> impl Future<Output = Result<Self::Model>> + Send;
}

/// Receiver for load progress in percent.
#[derive(Clone)]
pub struct ProgressSink {
    report: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressSink {
    /// Wrap a callback receiving percent values.
    pub fn new(report: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            report: Arc::new(report),
        }
    }

    /// A sink that discards every report.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report a percent value, clamped to 100.
    pub fn report(&self, percent: u8) {
        (self.report)(percent.min(100));
    }

    /// Report `done` out of `total` units. Ignored when `total` is zero.
    pub fn fraction(&self, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = (u128::from(done) * 100 / u128::from(total)).min(100);
        self.report(percent as u8);
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}
