use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request header carrying the payment proof.
pub const PAYMENT_HEADER: &str = "X-Payment";

/// Whether proofs are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    #[default]
    Enforce,
    /// Non-production only. Every paid request passes unverified.
    Disabled,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Disabled => "disabled",
        }
    }
}

/// Immutable gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub mode: VerificationMode,
    /// Address that must receive the payment.
    pub recipient: String,
    pub network: String,
    pub token: String,
}

impl GateConfig {
    pub fn terms(&self) -> PaymentTerms {
        PaymentTerms {
            network: self.network.clone(),
            token: self.token.clone(),
            recipient: self.recipient.clone(),
        }
    }
}

/// What a caller must pay, reported on rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerms {
    pub network: String,
    pub token: String,
    pub recipient: String,
}

/// Payment details attached to a request after verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    /// On-chain reference of the payment (transaction hash).
    pub reference: String,
    pub amount: Decimal,
    pub token: String,
    pub network: String,
    pub recipient: String,
    pub payer: String,
}

/// Outcome of passing a request through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Verified(VerifiedPayment),
    /// Verification is disabled by configuration.
    Skipped,
}

impl GateDecision {
    pub fn payment(&self) -> Option<&VerifiedPayment> {
        match self {
            Self::Verified(p) => Some(p),
            Self::Skipped => None,
        }
    }
}

/// Body posted to `{facilitator}/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub payment_proof: String,
    pub recipient: String,
}

/// Facilitator verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub payer: String,
    #[serde(default)]
    pub error: Option<String>,
}
