use std::sync::Arc;

use crate::error::PaymentError;
use crate::facilitator::Facilitator;
use crate::types::{GateConfig, GateDecision, PaymentTerms, VerificationMode, VerifiedPayment};

/// Guards paid operations.
pub struct PaymentGate {
    config: GateConfig,
    facilitator: Option<Arc<dyn Facilitator>>,
}

impl PaymentGate {
    /// Build a gate. `Enforce` without a facilitator or recipient is a
    /// configuration error, not a silent downgrade to `Disabled`.
    pub fn new(
        config: GateConfig,
        facilitator: Option<Arc<dyn Facilitator>>,
    ) -> Result<Self, PaymentError> {
        if config.mode == VerificationMode::Enforce {
            if facilitator.is_none() {
                return Err(PaymentError::Config(
                    "verification is enforced but no facilitator is configured".into(),
                ));
            }
            if config.recipient.trim().is_empty() {
                return Err(PaymentError::Config(
                    "verification is enforced but no recipient is configured".into(),
                ));
            }
        }
        Ok(Self { config, facilitator })
    }

    pub fn mode(&self) -> VerificationMode {
        self.config.mode
    }

    pub fn terms(&self) -> PaymentTerms {
        self.config.terms()
    }

    /// Check a proof taken from the request.
    pub async fn verify(&self, proof: Option<&str>) -> Result<GateDecision, PaymentError> {
        let facilitator = match (&self.config.mode, &self.facilitator) {
            (VerificationMode::Disabled, _) => {
                tracing::debug!("payment verification disabled, skipping");
                return Ok(GateDecision::Skipped);
            }
            (VerificationMode::Enforce, Some(f)) => f,
            (VerificationMode::Enforce, None) => {
                return Err(PaymentError::Config("no facilitator configured".into()));
            }
        };

        let proof = match proof.map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => return Err(PaymentError::PaymentRequired(self.terms())),
        };

        let verdict = facilitator.verify(proof, &self.config.recipient).await?;
        if !verdict.valid {
            let reason = verdict
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "invalid payment".to_string());
            tracing::debug!(reason = %reason, "payment rejected by facilitator");
            return Err(PaymentError::Rejected {
                reason,
                terms: self.terms(),
            });
        }

        // An empty recipient means the facilitator checked against the one we sent.
        let recipient = if verdict.recipient.is_empty() {
            self.config.recipient.clone()
        } else {
            verdict.recipient
        };
        if !recipient.eq_ignore_ascii_case(&self.config.recipient) {
            return Err(PaymentError::Rejected {
                reason: format!("payment sent to {recipient}"),
                terms: self.terms(),
            });
        }

        let payment = VerifiedPayment {
            reference: verdict.tx_hash,
            amount: verdict.amount,
            token: verdict.token,
            network: verdict.network,
            recipient,
            payer: verdict.payer,
        };
        tracing::info!(
            reference = %payment.reference,
            amount = %payment.amount,
            payer = %payment.payer,
            "payment verified"
        );
        Ok(GateDecision::Verified(payment))
    }
}
