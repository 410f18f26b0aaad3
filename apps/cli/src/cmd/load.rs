//! Model load command.

use super::Session;
use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

/// Download and load the model, showing progress.
#[derive(Args, Debug)]
pub struct Load;

impl Load {
    /// Load the model and report when it is ready.
    pub async fn run(self, session: &Session) -> Result<()> {
        wait_ready(session).await
    }
}

/// Load the model behind a progress bar, returning once it is ready.
///
/// Ctrl+C stops waiting; the load itself keeps running until the process
/// exits.
pub async fn wait_ready(session: &Session) -> Result<()> {
    if session.state().is_ready() {
        return Ok(());
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")?
            .progress_chars("=> "),
    );
    bar.set_message("loading model");

    let position = bar.clone();
    let loaded = session.ensure_loaded(move |percent| position.set_position(percent.into()));
    tokio::select! {
        result = loaded => match result {
            Ok(_) => {
                bar.finish_with_message("model ready");
                Ok(())
            }
            Err(err) => {
                bar.abandon_with_message("model load failed");
                Err(err.into())
            }
        },
        _ = tokio::signal::ctrl_c() => {
            bar.abandon_with_message("interrupted");
            anyhow::bail!("interrupted while loading the model")
        }
    }
}
