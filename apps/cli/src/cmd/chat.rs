//! Interactive chat REPL command.

use super::{Session, load::wait_ready};
use crate::repl::ChatRepl;
use anyhow::Result;
use clap::Args;

/// Start an interactive chat REPL.
#[derive(Args, Debug)]
pub struct Chat;

impl Chat {
    /// Load the model, then enter the REPL.
    pub async fn run(self, session: Session) -> Result<()> {
        wait_ready(&session).await?;
        let mut repl = ChatRepl::new(session)?;
        repl.run().await
    }
}
