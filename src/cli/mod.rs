//! Command-line interface definitions.

pub mod check;
pub mod output;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Edifice - building telemetry ingestion, alerting and live distribution.
#[derive(Parser, Debug)]
#[command(name = "edifice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Connect to the broker and run every service (default)
    Run,

    /// Validate the configuration file and print a summary
    Check,
}

impl Cli {
    /// Subcommand to execute; `run` when none was given.
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default() {
        let cli = Cli::try_parse_from(["edifice"]).unwrap();
        assert_eq!(cli.command(), Commands::Run);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn config_flag_applies_after_subcommand() {
        let cli = Cli::try_parse_from(["edifice", "check", "--config", "site.toml"]).unwrap();
        assert_eq!(cli.command(), Commands::Check);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }
}
