//! Session configuration loaded from TOML.

use crate::prompt::DEFAULT_PERSONA;
use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config directory name under the platform config dir.
pub const CONFIG_DIR: &str = "papilio";
/// Config file name.
pub const CONFIG_FILE: &str = "papilio.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inference engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Assistant behavior.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl SessionConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid session config")
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Render the config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize session config")
    }
}

/// Inference engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the Ollama-compatible inference server.
    pub base_url: String,
    /// Model identifier to pull and chat with.
    pub model: CompactString,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: llm::DEFAULT_BASE_URL.to_owned(),
            model: "phi3.5".into(),
        }
    }
}

/// Assistant behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// System prompt prepended to every chat.
    pub persona: String,
    /// Start a new load attempt when the model is requested after a failed
    /// load. When false, a failed load stays failed for the process lifetime.
    pub retry_on_failure: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_owned(),
            retry_on_failure: false,
        }
    }
}
