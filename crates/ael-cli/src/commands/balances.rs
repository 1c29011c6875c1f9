//! `ael balances` — Show participant balances.

use ael_core::CreditBalance;
use clap::Args;
use serde::Deserialize;

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct BalancesArgs {
    /// Channel id.
    pub channel_id: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct BalancesResponse {
    balances: Vec<CreditBalance>,
}

pub async fn run(args: &BalancesArgs) -> anyhow::Result<()> {
    let client = NodeClient::new(&args.endpoint);
    let resp: BalancesResponse = client
        .get(&format!("channels/{}/balances", args.channel_id))
        .await?;

    println!("Balances for {}:", args.channel_id);
    let mut total = 0u64;
    for b in &resp.balances {
        println!("  {:<20} {:>12}", b.agent_id, b.balance);
        total += b.balance;
    }
    println!("  {:<20} {:>12}", "total", total);
    Ok(())
}
