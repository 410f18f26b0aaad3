//! Interactive chat REPL with streaming output and persistent history.

use crate::cmd::Session;
use anyhow::Result;
use futures_util::StreamExt;
use llm::{Message, MessageBuilder, Role};
use rustyline::error::ReadlineError;
use session::{ReplyStream, config::CONFIG_DIR};
use std::{io::Write, path::PathBuf};

/// Shown in place of a reply when the model fails mid-conversation.
pub const FALLBACK_REPLY: &str = "Sorry, I ran into a problem. Please try again later.";

/// Interactive chat REPL over a loaded session.
pub struct ChatRepl {
    session: Session,
    editor: rustyline::DefaultEditor,
    history: Vec<Message>,
    history_path: Option<PathBuf>,
}

impl ChatRepl {
    /// Create a new REPL over `session`.
    pub fn new(session: Session) -> Result<Self> {
        let mut editor = rustyline::DefaultEditor::new()?;
        let history_path = history_file_path();
        if let Some(ref path) = history_path {
            let _ = editor.load_history(path);
        }
        Ok(Self {
            session,
            editor,
            history: Vec::new(),
            history_path,
        })
    }

    /// Run the interactive REPL loop.
    pub async fn run(&mut self) -> Result<()> {
        println!("Papilio chat (Ctrl+D to exit, Ctrl+C to cancel, /clear to reset)");
        println!("---");

        loop {
            match self.editor.readline("> ") {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);
                    if line == "/clear" {
                        self.history.clear();
                        continue;
                    }
                    self.send(line).await;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        self.save_history();
        Ok(())
    }

    /// Send one user turn and record the reply.
    async fn send(&mut self, line: String) {
        self.history.push(Message::user(line));
        let reply = match self.session.chat(&self.history) {
            Ok(reply) => stream_to_terminal(reply).await,
            Err(e) => Err(e),
        };
        if let Some(notice) = record_reply(&mut self.history, reply) {
            println!("{notice}");
        }
    }

    fn save_history(&mut self) {
        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = self.editor.save_history(path);
        }
    }
}

/// Resolve the history file path at `~/.config/papilio/history`.
fn history_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR).join("history"))
}

/// Shown when the model is not loaded yet.
pub const NOT_READY_REPLY: &str = "The model is still loading. Please try again shortly.";

/// Settle the pending user turn at the end of `history` with `reply`.
///
/// A non-empty reply is appended. An empty or failed reply removes the user
/// turn so the next request does not carry it; failures return the notice
/// to show instead.
pub fn record_reply(
    history: &mut Vec<Message>,
    reply: session::Result<Message>,
) -> Option<&'static str> {
    match reply {
        Ok(message) if !message.content.is_empty() => {
            history.push(message);
            None
        }
        Ok(_) => {
            history.pop();
            None
        }
        Err(e) => {
            history.pop();
            if e.is_retryable() {
                Some(NOT_READY_REPLY)
            } else {
                tracing::warn!("chat reply failed: {e}");
                Some(FALLBACK_REPLY)
            }
        }
    }
}

/// Print reply chunks to stdout as they arrive and collect the message.
///
/// Ctrl+C cancels the reply, keeping what was already printed.
async fn stream_to_terminal(mut reply: ReplyStream) -> session::Result<Message> {
    let mut builder = MessageBuilder::new(Role::Assistant);
    let outcome = loop {
        tokio::select! {
            chunk = reply.next() => match chunk {
                Some(Ok(chunk)) => {
                    if builder.accept(&chunk) {
                        print!("{}", chunk.content());
                        std::io::stdout().flush().ok();
                    }
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                reply.cancel();
                break Ok(());
            }
        }
    };

    println!();
    outcome.map(|()| builder.build())
}
