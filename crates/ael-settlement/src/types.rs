use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Token base units per whole currency unit (USDC has 6 decimals).
pub const USDC_BASE_UNITS: u64 = 1_000_000;

/// A participant that resolved to a chain address and takes part in the
/// settlement call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub agent_id: String,
    pub address: String,
    /// Final credit balance.
    pub balance: u64,
}

/// Result of a settlement attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettleReceipt {
    /// The escrow accepted the batched call.
    Submitted {
        tx_ref: String,
        recipients: Vec<Recipient>,
        /// Agents left out because they had no resolvable address.
        skipped: Vec<String>,
    },
    /// No escrow configured; nothing was sent on-chain.
    Degraded,
}

impl SettleReceipt {
    pub fn tx_ref(&self) -> Option<&str> {
        match self {
            Self::Submitted { tx_ref, .. } => Some(tx_ref),
            Self::Degraded => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }
}

/// Resolved recipients for one settlement, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementPlan {
    /// One batched escrow call.
    Batch {
        recipients: Vec<Recipient>,
        skipped: Vec<String>,
    },
    /// No escrow configured.
    Degraded,
}

/// Validate a 20-byte hex address and return it lowercased with a `0x` prefix.
pub fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if body.len() != 40 {
        return None;
    }
    let bytes = hex::decode(body).ok()?;
    Some(format!("0x{}", hex::encode(bytes)))
}

/// Encode a channel id as the escrow's `bytes32` key: the UTF-8 bytes,
/// right-padded with zeros and truncated at 32 bytes.
pub fn channel_id_bytes32(channel_id: &str) -> String {
    let mut buf = [0u8; 32];
    let src = channel_id.as_bytes();
    let n = src.len().min(32);
    buf[..n].copy_from_slice(&src[..n]);
    format!("0x{}", hex::encode(buf))
}

/// Convert a currency amount into token base units, truncating sub-unit dust.
pub fn usdc_base_units(amount: Decimal) -> Option<u64> {
    if amount.is_sign_negative() {
        return None;
    }
    amount
        .checked_mul(Decimal::from(USDC_BASE_UNITS))?
        .trunc()
        .to_u64()
}
