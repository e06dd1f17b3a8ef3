//! Fleetdesk CLI entry point.
//!
//! Binary name: `fdesk`
//!
//! Parses CLI arguments, loads configuration, opens the draft store when a
//! command needs it, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use fleetdesk_infra::config::load_global_config;
use fleetdesk_infra::filesystem::resolve_data_dir;
use fleetdesk_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_directives};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(verbosity_directives(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "fdesk", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let config = load_global_config(&data_dir).await;
    tracing::debug!(data_dir = %data_dir.display(), "configuration loaded");

    match cli.command {
        Commands::Quote(args) => cli::quote::quote(&config.pricing, &args, cli.json)?,

        Commands::Config => cli::config::show_config(&data_dir, &config, cli.json)?,

        Commands::Draft { action } => {
            let state = AppState::init(data_dir, config).await?;
            cli::draft::handle_draft_command(action, &state, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
