use async_trait::async_trait;

use crate::error::{ResolveError, SettlementError};

/// Chain-facing escrow contract client.
///
/// Implementations submit a transaction and return its reference (the
/// transaction hash). Amounts passed to `deposit`/`topup` are in the token's
/// 6-decimal base units; `settle` balances are credit units.
#[async_trait]
pub trait EscrowClient: Send + Sync {
    /// Distribute the escrowed deposit according to final credit balances.
    async fn settle(
        &self,
        channel_id: &str,
        addresses: &[String],
        balances: &[u64],
    ) -> Result<String, SettlementError>;

    /// Record the initial deposit for a channel.
    async fn deposit(&self, channel_id: &str, usdc_base_units: u64)
        -> Result<String, SettlementError>;

    /// Record an additional deposit for a channel.
    async fn topup(&self, channel_id: &str, usdc_base_units: u64)
        -> Result<String, SettlementError>;

    /// Short identifier used in logs (e.g. "escrow-http").
    fn client_id(&self) -> &str;
}

/// Maps agent identifiers to chain addresses.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve an agent to a normalized `0x`-prefixed address.
    async fn resolve(&self, agent_id: &str) -> Result<String, ResolveError>;
}
