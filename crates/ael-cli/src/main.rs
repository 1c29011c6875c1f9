//! AEL CLI — Command-line client for an AEL channel node.
//!
//! Subcommands: create, send, topup, close, resolve, balances, events, status.

mod commands;

use clap::{Parser, Subcommand};

/// AEL — off-chain payment channels for agents.
#[derive(Parser, Debug)]
#[command(name = "ael", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a channel funded by a deposit.
    Create(commands::create::CreateArgs),
    /// Transfer credits between two participants.
    Send(commands::send::SendArgs),
    /// Mint more credits to a participant.
    Topup(commands::topup::TopupArgs),
    /// Close a channel and settle its balances.
    Close(commands::close::CloseArgs),
    /// Mark a stuck settlement as resolved by hand.
    Resolve(commands::close::ResolveArgs),
    /// Show participant balances.
    Balances(commands::balances::BalancesArgs),
    /// Show the event log.
    Events(commands::events::EventsArgs),
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Create(args) => commands::create::run(args).await,
        Commands::Send(args) => commands::send::run(args).await,
        Commands::Topup(args) => commands::topup::run(args).await,
        Commands::Close(args) => commands::close::run(args).await,
        Commands::Resolve(args) => commands::close::resolve(args).await,
        Commands::Balances(args) => commands::balances::run(args).await,
        Commands::Events(args) => commands::events::run(args).await,
        Commands::Status(args) => commands::status::run(args).await,
    }
}
