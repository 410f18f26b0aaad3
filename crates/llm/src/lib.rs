//! Model interface types and traits for the Papilio assistant.
//!
//! This crate provides the shared types every engine speaks: `Message`,
//! `Role`, `StreamChunk`, `Request`, the `Model` capability trait and the
//! `Loader` trait that bootstraps a model. Also provides `HttpEngine` and
//! `HttpLoader` for an Ollama-compatible local inference server.

#[cfg(feature = "http")]
pub use http::{DEFAULT_BASE_URL, HttpEngine, HttpLoader};
pub use loader::{Loader, ProgressSink};
pub use message::{Message, MessageBuilder, Role};
pub use model::Model;
pub use request::Request;
#[cfg(feature = "http")]
pub use reqwest::{self, Client};
pub use stream::StreamChunk;
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "http")]
mod http;
mod loader;
mod message;
mod model;
mod request;
mod stream;
