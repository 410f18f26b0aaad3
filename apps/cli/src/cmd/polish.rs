//! Text polish command.

use super::{Session, load::wait_ready};
use anyhow::{Result, bail};
use clap::Args;
use std::io::Write;

/// Rewrite text to be clearer.
#[derive(Args, Debug)]
pub struct Polish {
    /// The text to polish.
    pub text: String,

    /// Print the rewrite as it is generated.
    #[arg(long)]
    pub live: bool,
}

impl Polish {
    /// Polish the text and print the result.
    pub async fn run(self, session: &Session) -> Result<()> {
        if self.text.trim().is_empty() {
            bail!("nothing to polish: text is empty");
        }
        wait_ready(session).await?;

        if !self.live {
            println!("{}", session.polish(&self.text).await?);
            return Ok(());
        }

        let mut printed = 0;
        session
            .polish_live(&self.text, |text| {
                if let Some(delta) = text.get(printed..) {
                    print!("{delta}");
                    std::io::stdout().flush().ok();
                }
                printed = text.len();
            })
            .await?;
        println!();
        Ok(())
    }
}
