//! Command-line interface, parsed with clap.

use clap::{Parser, Subcommand};

/// Rugby roster API with password + PIN login and bearer tokens
#[derive(Parser)]
#[command(name = "rugby-roster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create a default config.toml in the working directory
    Init,
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}
