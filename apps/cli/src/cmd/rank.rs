//! Event ranking command.

use super::{Session, load::wait_ready};
use anyhow::{Context, Result};
use clap::Args;
use session::EventSummary;
use std::path::{Path, PathBuf};

/// Rank events from a JSON file by importance.
#[derive(Args, Debug)]
pub struct Rank {
    /// JSON file holding an array of `{"id", "title"}` objects.
    pub file: PathBuf,
}

impl Rank {
    /// Rank the events and print them, most important first.
    pub async fn run(self, session: &Session) -> Result<()> {
        let events = read_events(&self.file)?;
        if events.is_empty() {
            println!("no events to rank");
            return Ok(());
        }
        wait_ready(session).await?;

        let ranked = session.rank_events(&events).await?;
        for (i, id) in ranked.iter().enumerate() {
            match events.iter().find(|event| event.id == *id) {
                Some(event) => println!("{}. {} ({id})", i + 1, event.title),
                None => println!("{}. {id}", i + 1),
            }
        }
        Ok(())
    }
}

/// Read event summaries from a JSON file.
pub fn read_events(path: &Path) -> Result<Vec<EventSummary>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
