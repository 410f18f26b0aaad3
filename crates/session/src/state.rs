//! Load lifecycle of the shared model.

use crate::ModelLoadError;

/// Lifecycle of the shared model.
///
/// `Unloaded -> Loading -> Ready | Failed`. `Ready` is terminal; `Failed`
/// is terminal unless the manager is configured to retry.
#[derive(Debug, Clone)]
pub enum LoadState<M> {
    /// No load has been requested yet.
    Unloaded,
    /// A load is in flight at the given percent.
    Loading(u8),
    /// The model is loaded and cached.
    Ready(M),
    /// The load attempt failed.
    Failed(ModelLoadError),
}

impl<M> Default for LoadState<M> {
    fn default() -> Self {
        LoadState::Unloaded
    }
}

impl<M> LoadState<M> {
    /// Latest known percent-complete.
    pub fn percent(&self) -> u8 {
        match self {
            LoadState::Unloaded | LoadState::Failed(_) => 0,
            LoadState::Loading(percent) => *percent,
            LoadState::Ready(_) => 100,
        }
    }

    /// Whether the load has settled, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Ready(_) | LoadState::Failed(_))
    }

    /// Whether the model is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }

    /// The cached model, if ready.
    pub fn handle(&self) -> Option<&M> {
        match self {
            LoadState::Ready(model) => Some(model),
            _ => None,
        }
    }

    /// Short name of the state for logs.
    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading(_) => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Failed(_) => "failed",
        }
    }
}

/// What a progress observer receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// Percent-complete of the in-flight load.
    Progress(u8),
    /// The model finished loading.
    Ready,
    /// The load attempt failed; no further progress follows for it.
    Failed(ModelLoadError),
}
