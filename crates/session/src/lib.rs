//! Shared model session for the Papilio assistant.
//!
//! A [`SessionManager`] is created once per process and handed to every
//! feature that needs the model. It lazily loads the model through an
//! [`EngineLoader`] exactly once, fans load progress out to every
//! subscriber through a [`ProgressBroadcaster`], and exposes chat, text
//! polishing and event ranking on top of the loaded handle.

pub use broadcaster::{ObserverToken, ProgressBroadcaster, Subscription};
pub use config::{AssistantConfig, EngineConfig, SessionConfig};
pub use error::{Error, ModelLoadError, Result};
pub use loader::EngineLoader;
pub use manager::{ReplyStream, SessionManager};
pub use rank::EventSummary;
pub use state::{LoadEvent, LoadState};

mod broadcaster;
pub mod config;
mod error;
mod loader;
mod manager;
pub mod prompt;
mod rank;
mod state;
#[cfg(feature = "testing")]
pub mod testing;
