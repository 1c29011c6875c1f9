//! `ael create` — Open a channel funded by a deposit.

use ael_core::{Channel, ChannelMode, CreateChannelRequest, DEFAULT_CHANNEL_TYPE};
use clap::Args;
use rust_decimal::Decimal;

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Participant agent ids, comma separated. The first one receives the deposit.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub participants: Vec<String>,

    /// Deposit in USDC. Replaced by the verified amount when paying.
    #[arg(short, long, default_value = "0")]
    pub usdc: Decimal,

    /// Use this channel id instead of a generated one.
    #[arg(long)]
    pub channel_id: Option<String>,

    /// Channel type label.
    #[arg(long = "type", default_value = DEFAULT_CHANNEL_TYPE)]
    pub channel_type: String,

    /// Participant cap (0 uses the node default).
    #[arg(long, default_value_t = 0)]
    pub max_participants: u32,

    /// Payment proof sent in the X-Payment header.
    #[arg(long)]
    pub payment: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &CreateArgs) -> anyhow::Result<()> {
    let req = CreateChannelRequest {
        mode: ChannelMode::Lite,
        channel_id: args.channel_id.clone(),
        channel_type: args.channel_type.clone(),
        participants: args.participants.clone(),
        usdc_amount: args.usdc,
        max_participants: args.max_participants,
    };

    let client = NodeClient::new(&args.endpoint);
    let ch: Channel = client.post("channels", &req, args.payment.as_deref()).await?;

    println!("Channel created!");
    println!("  Channel:  {}", ch.channel_id);
    println!("  Type:     {}", ch.channel_type);
    println!("  Status:   {}", ch.status);
    println!("  Deposit:  {} USDC", ch.total_usdc_deposited);
    println!("  Credits:  {}", ch.total_credits_minted);
    println!("  Members:  {}", args.participants.join(", "));
    Ok(())
}
