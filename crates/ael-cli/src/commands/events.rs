//! `ael events` — Show the node's event log.

use ael_core::EventRecord;
use clap::Args;
use serde::Deserialize;

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Only show events for this channel.
    #[arg(short, long)]
    pub channel_id: Option<String>,

    /// Maximum number of events (0 uses the node default).
    #[arg(short, long, default_value_t = 0)]
    pub limit: usize,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct EventsResponse {
    events: Vec<EventRecord>,
}

fn events_path(args: &EventsArgs) -> String {
    let mut path = format!("events?limit={}", args.limit);
    if let Some(id) = &args.channel_id {
        path.push_str("&channel_id=");
        path.push_str(id);
    }
    path
}

pub async fn run(args: &EventsArgs) -> anyhow::Result<()> {
    let client = NodeClient::new(&args.endpoint);
    let resp: EventsResponse = client.get(&events_path(args)).await?;

    if resp.events.is_empty() {
        println!("No events.");
        return Ok(());
    }
    // oldest first, like a log
    for e in resp.events.iter().rev() {
        println!("{:>8}  {:>13}  {:<26} {}", e.seq, e.timestamp, e.kind, e.channel_id);
    }
    Ok(())
}
