//! `ael status` — Query the status of a running AEL node.

use clap::Args;
use serde::Deserialize;

use super::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    mode: String,
    backend: String,
    verification: String,
    uptime_secs: u64,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let client = NodeClient::new(&args.endpoint);
    let status: StatusResponse = client.get("status").await?;

    println!("Node Status:");
    println!("  Endpoint:     {}", args.endpoint);
    println!("  Version:      {}", status.version);
    println!("  Mode:         {}", status.mode);
    println!("  Storage:      {}", status.backend);
    println!("  Verification: {}", status.verification);
    println!("  Uptime:       {}s", status.uptime_secs);
    Ok(())
}
