//! CLI argument parsing and subcommand dispatch.

use crate::config::resolve_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use compact_str::CompactString;
use llm::{Client, HttpLoader};
use session::{SessionConfig, SessionManager};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

pub mod chat;
pub mod load;
pub mod polish;
pub mod rank;

/// The session type every command works against.
pub type Session = SessionManager<HttpLoader>;

/// PapilioTask local assistant.
#[derive(Parser, Debug)]
#[command(name = "papilio", version, about = "PapilioTask local assistant")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Config file path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model name override.
    #[arg(long, global = true)]
    pub model: Option<CompactString>,

    /// Verbosity level (use -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download and load the model, showing progress.
    Load(load::Load),
    /// Start an interactive chat REPL.
    Chat(chat::Chat),
    /// Rewrite text to be clearer.
    Polish(polish::Polish),
    /// Rank events from a JSON file by importance.
    Rank(rank::Rank),
}

impl Cli {
    /// Install the tracing subscriber. `RUST_LOG` wins over `-v`.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match self.verbose {
                0 => "warn",
                1 => "papilio_session=info,llm=info",
                2 => "papilio_session=debug,llm=debug,papilio_cli=debug",
                _ => "trace",
            };
            EnvFilter::new(directive)
        });

        fmt()
            .without_time()
            .with_env_filter(filter)
            .with_target(self.verbose != 0)
            .init();
    }

    /// Resolve the config, build the session and run the subcommand.
    pub async fn run(self) -> Result<()> {
        let mut config = resolve_config(self.config.as_deref())?;
        if let Some(model) = self.model {
            config.engine.model = model;
        }
        let session = build_session(&config);
        match self.command {
            Command::Load(cmd) => cmd.run(&session).await,
            Command::Chat(cmd) => cmd.run(session).await,
            Command::Polish(cmd) => cmd.run(&session).await,
            Command::Rank(cmd) => cmd.run(&session).await,
        }
    }
}

/// Build a session over the HTTP engine named in `config`.
pub fn build_session(config: &SessionConfig) -> Session {
    tracing::debug!(
        "using model {} at {}",
        config.engine.model,
        config.engine.base_url
    );
    let loader = HttpLoader::new(
        Client::new(),
        &config.engine.base_url,
        config.engine.model.clone(),
    );
    SessionManager::new(loader, config.assistant.clone())
}
