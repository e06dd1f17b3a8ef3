//! CLI command definitions for the `fdesk` binary.
//!
//! Uses clap derive macros for argument parsing. `quote` and `config` work
//! without a database; `draft` subcommands open the draft store.

pub mod config;
pub mod draft;
pub mod quote;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Back-office tooling for the agreement and reservation builders.
#[derive(Parser)]
#[command(name = "fdesk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Price a rental line from rates and dates.
    Quote(quote::QuoteArgs),

    /// Inspect and edit saved builder drafts.
    Draft {
        #[command(subcommand)]
        action: draft::DraftCommand,
    },

    /// Show the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdesk_types::draft::BuilderKind;

    #[test]
    fn test_global_flags_anywhere() {
        let cli = Cli::try_parse_from(["fdesk", "draft", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Draft {
                action: draft::DraftCommand::List
            }
        ));
    }

    #[test]
    fn test_draft_check_kind() {
        let cli = Cli::try_parse_from([
            "fdesk",
            "draft",
            "check",
            "reservation-7",
            "--kind",
            "reservation",
        ])
        .unwrap();
        match cli.command {
            Commands::Draft {
                action: draft::DraftCommand::Check { key, kind },
            } => {
                assert_eq!(key, "reservation-7");
                assert_eq!(kind, Some(BuilderKind::Reservation));
            }
            _ => panic!("expected draft check"),
        }
    }

    #[test]
    fn test_quote_requires_dates() {
        assert!(Cli::try_parse_from(["fdesk", "quote", "--daily", "50"]).is_err());
    }
}
