//! # warp-cli
//!
//! Entry point for the `warp-cli` binary. Parses arguments, initializes
//! logging, resolves the pipeline configuration and runs one subcommand:
//!
//! - `propose`     — submit a DAO proposal
//! - `batch`       — submit proposals from a file and write a JSON report
//! - `call`        — call any contract endpoint
//! - `deploy`      — deploy a contract and print its address
//! - `publish`     — inscribe a warp, optionally registering an alias
//! - `interactive` — prompt for a proposal and submit it
//! - `address`     — print a keystore's address
//! - `status`      — wait for a broadcast transaction's outcome

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;

use cli::{Commands, WarpCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WarpCli::parse();
    logging::init_logging("warp_cli=info,warp_core=info", cli.log_format);

    let config = commands::load_config(cli.config.as_deref(), cli.network, cli.no_wait)?;
    tracing::debug!(network = %config.network, await_outcome = config.await_outcome, "configuration resolved");

    match cli.command {
        Commands::Propose(args) => commands::propose(args, config).await,
        Commands::Batch(args) => commands::batch(args, config).await,
        Commands::Call(args) => commands::call(args, config).await,
        Commands::Deploy(args) => commands::deploy(args, config).await,
        Commands::Publish(args) => commands::publish(args, config).await,
        Commands::Interactive(args) => commands::interactive(args, config).await,
        Commands::Address(wallet) => commands::address(wallet).await,
        Commands::Status(args) => commands::status(args, config).await,
    }
}
