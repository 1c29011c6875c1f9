use ael_core::{Channel, EventRecord, Settlement, TransactionRecord};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

/// Event payloads, one variant per kind.
///
/// Serialized adjacently tagged: `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A channel was created and opened.
    ChannelCreated(Channel),
    /// A transfer committed.
    TxConfirmed(TransactionRecord),
    /// Credits were minted to a participant.
    CreditsToppedUp {
        agent_id: String,
        credits_added: u64,
        usdc_added: Decimal,
    },
    /// Balances froze and the settlement record was written.
    ChannelClosing { settlement: Settlement },
    /// The channel reached `settled`.
    ChannelSettled {
        settlement: Settlement,
        settle_tx_hash: Option<String>,
        degraded: bool,
    },
    /// A settlement attempt failed and was queued for retry.
    SettlementRetryPending { attempts: u32, reason: String },
    /// The escrow call's result was lost; the channel waits for an operator.
    SettlementUnconfirmed { attempts: u32, reason: String },
}

impl ChannelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChannelCreated(_) => "channel_created",
            Self::TxConfirmed(_) => "tx_confirmed",
            Self::CreditsToppedUp { .. } => "credits_topped_up",
            Self::ChannelClosing { .. } => "channel_closing",
            Self::ChannelSettled { .. } => "channel_settled",
            Self::SettlementRetryPending { .. } => "settlement_retry_pending",
            Self::SettlementUnconfirmed { .. } => "settlement_unconfirmed",
        }
    }
}

/// The fixed wire schema every subscriber receives.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: ChannelEvent,
    pub channel_id: String,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
}

impl EventEnvelope {
    pub fn new(channel_id: impl Into<String>, event: ChannelEvent) -> Self {
        Self {
            event,
            channel_id: channel_id.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// The event-log row for this envelope. The store assigns `seq` when it
    /// commits the row.
    pub fn to_record(&self) -> Result<EventRecord, serde_json::Error> {
        let mut tagged = serde_json::to_value(&self.event)?;
        let payload = tagged
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
        Ok(EventRecord {
            seq: 0,
            kind: self.event.kind().to_string(),
            channel_id: self.channel_id.clone(),
            payload,
            timestamp: self.timestamp,
        })
    }
}
