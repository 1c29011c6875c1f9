use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ExchangeRatio;
use crate::state_machine::ChannelStatus;

/// Which engine variant serves a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Balances live in the ledger store; the operator applies transfers.
    #[default]
    Lite,
    /// Externally signed state-channel variant.
    Pro,
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lite => write!(f, "lite"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

/// Channel type assigned when a create request names none.
pub const DEFAULT_CHANNEL_TYPE: &str = "private";

fn default_channel_type() -> String {
    DEFAULT_CHANNEL_TYPE.to_string()
}

/// A payment channel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Internal identifier.
    pub id: Uuid,
    /// External channel identifier (unique).
    pub channel_id: String,
    pub mode: ChannelMode,
    /// Free-form visibility label, e.g. "private" or "public".
    #[serde(rename = "type", default = "default_channel_type")]
    pub channel_type: String,
    pub status: ChannelStatus,
    /// Total deposited currency (deposit plus top-ups).
    pub total_usdc_deposited: Decimal,
    /// Total credits minted; always equals the sum of participant balances.
    pub total_credits_minted: u64,
    pub total_transactions: u64,
    /// Running mean of transfer latency in milliseconds.
    pub avg_latency_ms: f64,
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Written once when the channel leaves `active`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
    #[serde(default)]
    pub settlement_state: SettlementState,
}

impl Channel {
    /// A fresh channel in `pending` with nothing minted yet.
    pub fn new_pending(channel_id: String, mode: ChannelMode, max_participants: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            channel_id,
            mode,
            channel_type: default_channel_type(),
            status: ChannelStatus::Pending,
            total_usdc_deposited: Decimal::ZERO,
            total_credits_minted: 0,
            total_transactions: 0,
            avg_latency_ms: 0.0,
            max_participants,
            created_at: Utc::now(),
            opened_at: None,
            closed_at: None,
            settlement: None,
            settlement_state: SettlementState::None,
        }
    }

    /// Fold one latency sample into the running mean and bump the counter.
    pub fn record_transaction(&mut self, latency_ms: f64) {
        let n = self.total_transactions as f64;
        self.avg_latency_ms = (self.avg_latency_ms * n + latency_ms) / (n + 1.0);
        self.total_transactions += 1;
    }
}

/// One participant row: an agent's credit balance inside a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub channel_id: String,
    pub agent_id: String,
    pub balance: u64,
}

/// A participant row as returned by balance queries.
pub type CreditBalance = Participant;

/// Status of a recorded transaction. Only applied transfers are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Confirmed,
}

/// An applied transfer. Append-only; never modified after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_id: String,
    pub channel_id: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub memo: String,
    pub status: TxStatus,
    pub latency_ms: f64,
    pub created_at: DateTime<Utc>,
}

/// The result of an applied transfer is its log record.
pub type TxResult = TransactionRecord;

/// Request to open a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    #[serde(default)]
    pub mode: ChannelMode,
    /// Caller-chosen external id; generated when absent.
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(rename = "type", default = "default_channel_type")]
    pub channel_type: String,
    pub participants: Vec<String>,
    pub usdc_amount: Decimal,
    /// Zero means "use the configured default".
    #[serde(default)]
    pub max_participants: u32,
}

/// A transfer request inside a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
    #[serde(default)]
    pub memo: String,
}

/// A committed event as kept in the durable event log.
///
/// Written by the ledger store in the same commit as the mutation it
/// describes, so the log never shows an event whose change was rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Log position assigned at commit; strictly increasing across channels.
    #[serde(default)]
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub channel_id: String,
    pub payload: serde_json::Value,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
}

/// Final reconciliation of a channel's balances into currency owed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub channel_id: String,
    /// agent_id → final credit balance.
    pub balances: BTreeMap<String, u64>,
    /// agent_id → currency owed (`balance ÷ ratio`).
    pub usdc_owed: BTreeMap<String, Decimal>,
    /// Total currency deposited into the channel.
    pub total_usdc: Decimal,
    pub total_credits: u64,
    pub total_transactions: u64,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Build the settlement from a frozen balance snapshot.
    pub fn compute(channel: &Channel, participants: &[Participant], ratio: &ExchangeRatio) -> Self {
        let mut balances = BTreeMap::new();
        let mut usdc_owed = BTreeMap::new();
        let mut total_credits = 0u64;
        for p in participants {
            balances.insert(p.agent_id.clone(), p.balance);
            usdc_owed.insert(p.agent_id.clone(), ratio.to_currency(p.balance));
            total_credits = total_credits.saturating_add(p.balance);
        }
        Self {
            channel_id: channel.channel_id.clone(),
            balances,
            usdc_owed,
            total_usdc: channel.total_usdc_deposited,
            total_credits,
            total_transactions: channel.total_transactions,
            created_at: Utc::now(),
        }
    }

    /// Sum of currency owed to participants.
    pub fn total_owed(&self) -> Decimal {
        self.usdc_owed.values().copied().sum()
    }

    /// Deposited currency not attributable to any credit (mint truncation).
    pub fn unallocated(&self) -> Decimal {
        self.total_usdc - self.total_owed()
    }
}

/// Progress of the on-chain settlement for a channel that left `active`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementState {
    /// No settlement attempted (channel still pending or active).
    #[default]
    None,
    /// An attempt holds the claim; only its holder may call the escrow.
    InFlight {
        claimed_at: DateTime<Utc>,
        attempt: u32,
    },
    /// The escrow accepted the settlement call.
    Submitted { tx_ref: String, attempt: u32 },
    /// No escrow configured; settled off-chain only.
    Degraded,
    /// The last attempt failed; the reconciler will retry.
    RetryPending { attempts: u32, last_error: String },
    /// The escrow call was sent but its result never came back. The payout
    /// may or may not have happened, so nothing retries it automatically;
    /// an operator checks the chain and resolves it.
    Unconfirmed {
        attempt: u32,
        reason: String,
        since: DateTime<Utc>,
    },
    /// An operator closed out the settlement by hand.
    ManuallyResolved { reference: Option<String> },
}

impl SettlementState {
    /// Number of settlement attempts made so far.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::InFlight { attempt, .. }
            | Self::Submitted { attempt, .. }
            | Self::Unconfirmed { attempt, .. } => *attempt,
            Self::RetryPending { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Whether a new attempt may claim this settlement at `now`.
    ///
    /// An `InFlight` claim older than `stale_after` belongs to an attempt that
    /// was cancelled or crashed and may be taken over.
    pub fn is_claimable(&self, now: DateTime<Utc>, stale_after: chrono::Duration) -> bool {
        match self {
            Self::RetryPending { .. } => true,
            Self::InFlight { claimed_at, .. } => now.signed_duration_since(*claimed_at) >= stale_after,
            _ => false,
        }
    }

    /// Whether this state ends the lifecycle (channel becomes `settled`).
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Submitted { .. } | Self::Degraded | Self::ManuallyResolved { .. }
        )
    }
}
