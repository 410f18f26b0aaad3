//! Papilio CLI: loads the local assistant model and drives chat, text
//! polishing and event ranking from the terminal.

pub use cmd::{Cli, Command};

pub mod cmd;
pub mod config;
pub mod repl;
