//! Configuration resolution for the CLI.
//!
//! Resolves papilio.toml in priority order:
//! 1. `--config <path>` flag (explicit override)
//! 2. `{cwd}/.papilio/papilio.toml` (workspace config)
//! 3. `~/.config/papilio/papilio.toml` (global default)
//!
//! If the global default doesn't exist, it is generated automatically.

use anyhow::{Context, Result};
use session::{
    SessionConfig,
    config::{CONFIG_DIR, CONFIG_FILE},
};
use std::path::{Path, PathBuf};

/// Resolve the session config following the priority chain.
pub fn resolve_config(config_flag: Option<&Path>) -> Result<SessionConfig> {
    if let Some(path) = config_flag {
        return SessionConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    let workspace_path = workspace_config_path();
    if workspace_path.exists() {
        return SessionConfig::load(&workspace_path).context("failed to load workspace config");
    }

    load_or_generate(&global_config_path())
}

/// Load the config at `path`, writing the defaults there first if missing.
pub fn load_or_generate(path: &Path) -> Result<SessionConfig> {
    if path.exists() {
        return SessionConfig::load(path).context("failed to load global config");
    }

    generate_default_config(path)?;
    tracing::info!("generated default config at {}", path.display());
    SessionConfig::load(path).context("failed to load generated default config")
}

/// Path to the workspace config, relative to the current directory.
pub fn workspace_config_path() -> PathBuf {
    PathBuf::from(format!(".{CONFIG_DIR}")).join(CONFIG_FILE)
}

/// Path to the global default config.
pub fn global_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

fn generate_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let text = SessionConfig::default().to_toml()?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write default config to {}", path.display()))?;
    Ok(())
}
