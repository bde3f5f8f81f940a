//! Command-line interface, built on clap.
//!
//! Defines the [`Cli`] struct with subcommands [`Command`] (run, status,
//! publish) and the global `--verbose` flag.

use clap::{Parser, Subcommand};

/// reelbatch — restartable batch image-to-video generation.
#[derive(Debug, Parser)]
#[command(name = "reelbatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the batch: resume, submit pending items, poll, then publish.
    Run {
        /// Maximum parallel submissions.
        #[arg(long, default_value_t = 3)]
        concurrency: usize,

        /// Delay in seconds between submissions.
        #[arg(long, default_value_t = 2.0)]
        delay: f64,

        /// Show what would be generated without calling the API.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Print progress counts without touching the network.
    Status,

    /// Re-run publishing for already completed items.
    Publish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_defaults() {
        let cli = Cli::parse_from(["reelbatch", "run"]);
        match cli.command {
            Command::Run {
                concurrency,
                delay,
                dry_run,
            } => {
                assert_eq!(concurrency, 3);
                assert_eq!(delay, 2.0);
                assert!(!dry_run);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "reelbatch",
            "run",
            "--concurrency",
            "8",
            "--delay",
            "0.5",
            "--dry-run",
        ]);
        match cli.command {
            Command::Run {
                concurrency,
                delay,
                dry_run,
            } => {
                assert_eq!(concurrency, 8);
                assert_eq!(delay, 0.5);
                assert!(dry_run);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_global_verbose() {
        let cli = Cli::parse_from(["reelbatch", "--verbose", "status"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn cli_parses_publish_subcommand() {
        let cli = Cli::parse_from(["reelbatch", "publish"]);
        assert!(matches!(cli.command, Command::Publish));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
