//! `ael send` — Transfer credits inside a channel.

use ael_core::{TxRequest, TxResult};
use clap::Args;

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Channel id.
    pub channel_id: String,

    /// Sending agent id.
    #[arg(short, long)]
    pub from: String,

    /// Receiving agent id.
    #[arg(short, long)]
    pub to: String,

    /// Credits to transfer.
    #[arg(short, long)]
    pub amount: u64,

    /// Free-form memo stored with the transaction.
    #[arg(short, long, default_value = "")]
    pub memo: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &SendArgs) -> anyhow::Result<()> {
    let req = TxRequest {
        from: args.from.clone(),
        to: args.to.clone(),
        amount: args.amount,
        memo: args.memo.clone(),
    };

    let client = NodeClient::new(&args.endpoint);
    let tx: TxResult = client
        .post(&format!("channels/{}/transactions", args.channel_id), &req, None)
        .await?;

    println!("Transfer confirmed!");
    println!("  Tx:       {}", tx.tx_id);
    println!("  From:     {}", tx.from);
    println!("  To:       {}", tx.to);
    println!("  Amount:   {}", tx.amount);
    println!("  Latency:  {:.3} ms", tx.latency_ms);
    Ok(())
}
