//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ICT alert analyst: webhook in, AI analysis, Discord/Telegram out.
#[derive(Parser, Debug)]
#[command(name = "ict-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP webhook server (default).
    Serve,
    /// Poll the caretaker signal store instead of receiving webhooks.
    Poll,
    /// Run stored payloads (one object or an array) through the pipeline.
    Replay {
        /// JSON file with the payload(s).
        file: PathBuf,
    },
}

impl Cli {
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}
