use ael_core::{
    Channel, ChannelMode, CreateChannelRequest, CreditBalance, EventRecord, LedgerConfig,
    Settlement, TransactionRecord, TxRequest, TxResult,
};
use ael_ledger::ChannelSummary;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::context::OpContext;
use crate::error::ChannelError;

/// How a settlement attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The escrow accepted the call; the channel is `settled`.
    Submitted { tx_ref: String },
    /// No escrow configured; the channel is `settled` off-chain only.
    Degraded,
    /// The attempt failed before the escrow could act on it; the channel
    /// stays `closing` and may be retried.
    RetryPending { reason: String, attempts: u32 },
    /// The escrow call went out but its result is unknown; the channel stays
    /// `closing` until an operator resolves it.
    Unconfirmed { reason: String, attempts: u32 },
}

impl SettlementOutcome {
    /// Whether the channel reached `settled`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Submitted { .. } | Self::Degraded)
    }
}

/// Result of closing a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseReceipt {
    pub settlement: Settlement,
    pub outcome: SettlementOutcome,
}

/// Result of a top-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopupReceipt {
    pub channel_id: String,
    pub agent_id: String,
    pub credits_added: u64,
    pub usdc_added: Decimal,
    /// The agent's balance after the top-up.
    pub balance: u64,
    pub total_credits_minted: u64,
}

/// Channel capability interface.
///
/// One implementation per engine variant, chosen at construction. Every
/// operation takes an [`OpContext`] whose deadline bounds the store work.
#[async_trait]
pub trait ChannelEngine: Send + Sync {
    /// The mode this engine serves.
    fn mode(&self) -> ChannelMode;

    fn ledger_config(&self) -> &LedgerConfig;

    async fn create_channel(
        &self,
        ctx: &OpContext,
        req: CreateChannelRequest,
    ) -> Result<Channel, ChannelError>;

    async fn get_channel(&self, ctx: &OpContext, channel_id: &str) -> Result<Channel, ChannelError>;

    async fn send_transaction(
        &self,
        ctx: &OpContext,
        channel_id: &str,
        req: TxRequest,
    ) -> Result<TxResult, ChannelError>;

    /// Mint `amount` credits to a participant. Payment must already have
    /// been verified by the caller.
    async fn topup_credits(
        &self,
        ctx: &OpContext,
        channel_id: &str,
        agent_id: &str,
        amount: u64,
    ) -> Result<TopupReceipt, ChannelError>;

    /// Freeze balances, write the settlement and attempt it once.
    async fn close_channel(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<CloseReceipt, ChannelError>;

    /// Participant balances in join order.
    async fn get_balances(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<Vec<CreditBalance>, ChannelError>;

    async fn list_channels(
        &self,
        ctx: &OpContext,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChannelError>;

    async fn list_transactions(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<Vec<TransactionRecord>, ChannelError>;

    /// The durable event log, newest first, optionally for one channel.
    async fn list_events(
        &self,
        ctx: &OpContext,
        channel_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, ChannelError>;

    /// Closing channels whose settlement may be claimed for a retry now.
    async fn pending_settlements(&self, ctx: &OpContext) -> Result<Vec<Channel>, ChannelError>;

    /// Claim and re-attempt a pending settlement.
    async fn retry_settlement(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<SettlementOutcome, ChannelError>;

    /// Mark a stuck or unconfirmed settlement as resolved out of band.
    async fn resolve_settlement(
        &self,
        ctx: &OpContext,
        channel_id: &str,
        reference: Option<String>,
    ) -> Result<Channel, ChannelError>;
}
