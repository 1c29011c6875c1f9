//! `ael topup` — Mint more credits to a participant.

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct TopupArgs {
    /// Channel id.
    pub channel_id: String,

    /// Agent receiving the credits.
    #[arg(short, long)]
    pub agent: String,

    /// Credits to mint. Ignored when paying; the payment sets the amount.
    #[arg(short = 'n', long, default_value_t = 0)]
    pub amount: u64,

    /// Payment proof sent in the X-Payment header.
    #[arg(long)]
    pub payment: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct TopupRequest<'a> {
    agent_id: &'a str,
    amount: u64,
}

#[derive(Deserialize)]
struct TopupReceipt {
    credits_added: u64,
    usdc_added: Decimal,
    balance: u64,
    total_credits_minted: u64,
}

pub async fn run(args: &TopupArgs) -> anyhow::Result<()> {
    let body = TopupRequest {
        agent_id: &args.agent,
        amount: args.amount,
    };

    let client = NodeClient::new(&args.endpoint);
    let receipt: TopupReceipt = client
        .post(
            &format!("channels/{}/topup", args.channel_id),
            &body,
            args.payment.as_deref(),
        )
        .await?;

    println!("Credits topped up!");
    println!("  Agent:    {}", args.agent);
    println!("  Added:    {} ({} USDC)", receipt.credits_added, receipt.usdc_added);
    println!("  Balance:  {}", receipt.balance);
    println!("  Minted:   {} total", receipt.total_credits_minted);
    Ok(())
}
