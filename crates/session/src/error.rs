//! Session error taxonomy.

use std::sync::Arc;
use thiserror::Error;

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The model failed to load.
///
/// Cloneable so one failure can be handed to every observer waiting on the
/// same load attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model load failed: {message}")]
pub struct ModelLoadError {
    message: Arc<str>,
}

impl ModelLoadError {
    /// Create a load error with the given message.
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: Arc::from(message.as_ref()),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for ModelLoadError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

/// Errors surfaced by [`SessionManager`](crate::SessionManager) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Loading failed. Shared by everyone waiting on the load.
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    /// The model is not ready yet; try again later.
    #[error("model is not ready yet")]
    Unavailable,

    /// A completion call failed or returned a malformed payload.
    #[error("model inference failed: {0}")]
    ModelInference(String),

    /// Rejected locally without calling the model.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl Error {
    /// Whether the caller should retry later rather than give up.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable)
    }

    pub(crate) fn inference(err: anyhow::Error) -> Self {
        Error::ModelInference(format!("{err:#}"))
    }
}
