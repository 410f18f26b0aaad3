//! HTTP engine for an Ollama-compatible local inference server.
//!
//! `HttpLoader` pulls the model through `/api/pull`, turning the server's
//! newline-delimited progress reports into percent values, and hands back an
//! `HttpEngine` that completes chats through the OpenAI-compatible
//! `/v1/chat/completions` endpoint, streaming via Server-Sent Events.

use crate::{Loader, Message, Model, ProgressSink, Request, StreamChunk};
use anyhow::{Context, Result, anyhow, bail};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Bootstraps a model on the inference server.
#[derive(Clone, Debug)]
pub struct HttpLoader {
    client: Client,
    base_url: String,
    model: CompactString,
}

impl HttpLoader {
    /// Create a loader for `model` served at `base_url`.
    pub fn new(client: Client, base_url: &str, model: impl Into<CompactString>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.into(),
        }
    }

    /// The model this loader pulls.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Loader for HttpLoader {
    type Model = HttpEngine;

    async fn load(&self, progress: ProgressSink) -> Result<HttpEngine> {
        let url = format!("{}/api/pull", self.base_url);
        tracing::info!("pulling model {} from {url}", self.model);
        let response = self
            .client
            .post(&url)
            .json(&PullBody {
                model: &self.model,
                stream: true,
            })
            .send()
            .await
            .with_context(|| format!("failed to reach inference server at {}", self.base_url))?
            .error_for_status()?;

        let mut bytes = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut pull = PullProgress::default();
        let mut ready = false;
        while let Some(next) = bytes.next().await {
            for line in lines.push(&next?) {
                ready |= pull.apply(&line, &progress)?;
            }
        }
        if let Some(line) = lines.finish() {
            ready |= pull.apply(&line, &progress)?;
        }
        if !ready {
            bail!("pull of {} ended before the model was ready", self.model);
        }

        Ok(HttpEngine::new(
            self.client.clone(),
            &self.base_url,
            self.model.clone(),
        ))
    }
}

/// Chat completion client for a model already present on the server.
#[derive(Clone, Debug)]
pub struct HttpEngine {
    client: Client,
    endpoint: String,
    model: CompactString,
}

impl HttpEngine {
    /// Create an engine for `model` served at `base_url`.
    pub fn new(client: Client, base_url: &str, model: impl Into<CompactString>) -> Self {
        Self {
            client,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        }
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Model for HttpEngine {
    async fn send(&self, request: &Request) -> Result<String> {
        let body = ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
        };
        tracing::trace!("request: {}", serde_json::to_string(&body)?);
        let pending = self.client.post(&self.endpoint).json(&body).send();
        let response = request
            .cancel
            .run_until_cancelled(pending)
            .await
            .ok_or_else(|| anyhow!("request cancelled"))??
            .error_for_status()?;

        let completion: Completion = response.json().await?;
        completion
            .message_content()
            .ok_or_else(|| anyhow!("unexpected response format: missing message content"))
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamChunk>> + Send {
        let body = ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: true,
        };
        if let Ok(body) = serde_json::to_string(&body) {
            tracing::trace!("request: {body}");
        }
        let pending = self.client.post(&self.endpoint).json(&body);
        let cancel = request.cancel;

        try_stream! {
            if let Some(response) = cancel.run_until_cancelled(pending.send()).await {
                let mut bytes = response?.error_for_status()?.bytes_stream();
                let mut lines = LineBuffer::default();
                loop {
                    let next = match cancel.run_until_cancelled(bytes.next()).await {
                        Some(Some(next)) => next?,
                        Some(None) => break,
                        None => {
                            tracing::debug!("stream cancelled by caller");
                            break;
                        }
                    };
                    for line in lines.push(&next) {
                        if let Some(chunk) = parse_sse_line(&line) {
                            yield chunk;
                        }
                    }
                }
                if let Some(chunk) = lines.finish().as_deref().and_then(parse_sse_line) {
                    yield chunk;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct PullBody<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// One progress report of `/api/pull`.
#[derive(Debug, Default, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: String,
    digest: Option<String>,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

/// Completion body, shared by the one-shot response and stream chunks.
#[derive(Debug, Default, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    message: Option<Content>,
    delta: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    content: Option<String>,
}

impl Completion {
    fn message_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .message?
            .content
            .filter(|s| !s.is_empty())
    }

    fn delta_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|s| !s.is_empty())
    }
}

/// Highest percent a pull reports before the server confirms success.
const PULL_CEILING: u8 = 99;

/// Overall progress of a pull across every layer seen so far.
///
/// The server reports each layer separately, so percent is computed over the
/// summed layer sizes and never reported below its previous high. Layers not
/// announced yet are unknown, so byte counts alone report at most
/// [`PULL_CEILING`]; only the final `success` status reports 100.
#[derive(Debug, Default)]
struct PullProgress {
    layers: BTreeMap<String, (u64, u64)>,
    reported: u8,
}

impl PullProgress {
    /// Apply one pull report, returning whether the pull succeeded.
    fn apply(&mut self, line: &str, progress: &ProgressSink) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }
        let status: PullStatus =
            serde_json::from_str(line).with_context(|| format!("malformed pull report: {line}"))?;
        if let Some(error) = status.error {
            bail!("pull failed: {error}");
        }
        if let (Some(completed), Some(total)) = (status.completed, status.total) {
            let digest = status.digest.unwrap_or_default();
            self.layers.insert(digest, (completed.min(total), total));
            let (done, total) = self
                .layers
                .values()
                .fold((0u64, 0u64), |(d, t), (c, n)| (d.saturating_add(*c), t.saturating_add(*n)));
            if total > 0 {
                let percent = (u128::from(done) * 100 / u128::from(total))
                    .min(u128::from(PULL_CEILING)) as u8;
                self.advance(percent, progress);
            }
        }
        tracing::debug!("pull status: {}", status.status);
        let success = status.status == "success";
        if success {
            self.advance(100, progress);
        }
        Ok(success)
    }

    fn advance(&mut self, percent: u8, progress: &ProgressSink) {
        if percent > self.reported {
            self.reported = percent;
            progress.report(percent);
        }
    }
}

/// Parse one SSE line into a content chunk.
///
/// Skips non-data lines, the `[DONE]` sentinel and role-only deltas.
fn parse_sse_line(line: &str) -> Option<StreamChunk> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<Completion>(data) {
        Ok(completion) => completion.delta_content().map(StreamChunk::from),
        Err(e) => {
            tracing::warn!("failed to parse chunk: {e}, data: {data}");
            None
        }
    }
}

/// Splits a byte stream into complete lines.
///
/// Network chunks may cut a line or a multi-byte character in half, so bytes
/// are buffered until a newline arrives.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos]);
            let line = line.trim_end_matches('\r');
            if !line.is_empty() {
                lines.push(line.to_owned());
            }
        }
        lines
    }

    fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_owned();
        (!rest.is_empty()).then_some(rest)
    }
}
