//! `ael close` / `ael resolve` — Settle a channel.

use ael_core::{Channel, Settlement};
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Channel id.
    pub channel_id: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Channel id.
    pub channel_id: String,

    /// Reference for the out-of-band settlement (e.g. a transaction hash).
    #[arg(short, long)]
    pub reference: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum Outcome {
    Submitted { tx_ref: String },
    Degraded,
    RetryPending { reason: String, attempts: u32 },
    Unconfirmed { reason: String, attempts: u32 },
}

#[derive(Deserialize)]
struct CloseReceipt {
    settlement: Settlement,
    outcome: Outcome,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    reference: Option<&'a str>,
}

pub async fn run(args: &CloseArgs) -> anyhow::Result<()> {
    let client = NodeClient::new(&args.endpoint);
    let receipt: CloseReceipt = client
        .post(
            &format!("channels/{}/close", args.channel_id),
            &serde_json::json!({}),
            None,
        )
        .await?;

    let stl = &receipt.settlement;
    println!("Channel closed: {}", stl.channel_id);
    println!("  Transactions: {}", stl.total_transactions);
    println!("  Credits:      {}", stl.total_credits);
    println!("  USDC:         {}", stl.total_usdc);
    for (agent, owed) in &stl.usdc_owed {
        let credits = stl.balances.get(agent).copied().unwrap_or(0);
        println!("    {agent:<20} {credits:>12} credits  {owed} USDC");
    }
    println!();
    match receipt.outcome {
        Outcome::Submitted { tx_ref } => println!("Settled on-chain: {tx_ref}"),
        Outcome::Degraded => println!("Settled off-chain only (node has no escrow configured)"),
        Outcome::RetryPending { reason, attempts } => {
            println!("Settlement pending retry (attempt {attempts}): {reason}");
            println!("The node retries automatically; use 'ael resolve' if it was settled by hand.");
        }
        Outcome::Unconfirmed { reason, attempts } => {
            println!("Settlement outcome unknown (attempt {attempts}): {reason}");
            println!("The escrow may have paid out. It is not retried automatically:");
            println!("check the escrow contract, then run 'ael resolve --reference <tx>'.");
        }
    }
    Ok(())
}

pub async fn resolve(args: &ResolveArgs) -> anyhow::Result<()> {
    let client = NodeClient::new(&args.endpoint);
    let ch: Channel = client
        .post(
            &format!("channels/{}/resolve", args.channel_id),
            &ResolveRequest {
                reference: args.reference.as_deref(),
            },
            None,
        )
        .await?;

    println!("Settlement resolved: {} is {}", ch.channel_id, ch.status);
    Ok(())
}
