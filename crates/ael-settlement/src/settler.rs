use std::sync::Arc;

use ael_core::Settlement;

use crate::error::{ResolveError, SettlementError};
use crate::traits::{EscrowClient, IdentityResolver};
use crate::types::{Recipient, SettleReceipt, SettlementPlan};

/// Settlement orchestrator.
///
/// Stateless apart from its collaborators. It does not guard against being
/// called twice for the same channel; the channel engine's settlement claim
/// does that.
pub struct Settler {
    escrow: Option<Arc<dyn EscrowClient>>,
    resolver: Arc<dyn IdentityResolver>,
}

impl Settler {
    /// `escrow = None` selects degraded mode.
    pub fn new(escrow: Option<Arc<dyn EscrowClient>>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { escrow, resolver }
    }

    pub fn is_degraded(&self) -> bool {
        self.escrow.is_none()
    }

    /// The configured escrow client, if any.
    pub fn escrow(&self) -> Option<&Arc<dyn EscrowClient>> {
        self.escrow.as_ref()
    }

    /// Settle a frozen balance snapshot on-chain: [`prepare`](Self::prepare)
    /// followed by [`submit`](Self::submit).
    pub async fn settle(&self, settlement: &Settlement) -> Result<SettleReceipt, SettlementError> {
        let plan = self.prepare(settlement).await?;
        self.submit(settlement, plan).await
    }

    /// Resolve recipients without touching the escrow.
    ///
    /// Agents without a registered or well-formed address are skipped. A
    /// resolver outage aborts the attempt, since settling without those
    /// agents would pay out a different distribution than a later retry.
    pub async fn prepare(&self, settlement: &Settlement) -> Result<SettlementPlan, SettlementError> {
        if self.escrow.is_none() {
            return Ok(SettlementPlan::Degraded);
        }
        let (recipients, skipped) = self.resolve_recipients(settlement).await?;
        if recipients.is_empty() {
            return Err(SettlementError::NoEligibleRecipients(
                settlement.channel_id.clone(),
            ));
        }
        Ok(SettlementPlan::Batch {
            recipients,
            skipped,
        })
    }

    /// Send the batched escrow call for a prepared plan.
    ///
    /// Errors for which [`SettlementError::is_ambiguous`] holds leave the
    /// payout in an unknown state.
    pub async fn submit(
        &self,
        settlement: &Settlement,
        plan: SettlementPlan,
    ) -> Result<SettleReceipt, SettlementError> {
        let (escrow, recipients, skipped) = match (&self.escrow, plan) {
            (Some(escrow), SettlementPlan::Batch { recipients, skipped }) => {
                (escrow, recipients, skipped)
            }
            _ => {
                tracing::info!(
                    channel_id = %settlement.channel_id,
                    "escrow not configured, skipping on-chain settlement"
                );
                return Ok(SettleReceipt::Degraded);
            }
        };

        let addresses: Vec<String> = recipients.iter().map(|r| r.address.clone()).collect();
        let balances: Vec<u64> = recipients.iter().map(|r| r.balance).collect();
        let tx_ref = escrow
            .settle(&settlement.channel_id, &addresses, &balances)
            .await?;

        tracing::info!(
            channel_id = %settlement.channel_id,
            escrow = escrow.client_id(),
            tx_ref = %tx_ref,
            recipients = recipients.len(),
            skipped = skipped.len(),
            "escrow settlement submitted"
        );

        Ok(SettleReceipt::Submitted {
            tx_ref,
            recipients,
            skipped,
        })
    }

    /// Resolve every tracked agent in balance-map order.
    async fn resolve_recipients(
        &self,
        settlement: &Settlement,
    ) -> Result<(Vec<Recipient>, Vec<String>), SettlementError> {
        let mut recipients = Vec::with_capacity(settlement.balances.len());
        let mut skipped = Vec::new();

        for (agent_id, balance) in &settlement.balances {
            match self.resolver.resolve(agent_id).await {
                Ok(address) => recipients.push(Recipient {
                    agent_id: agent_id.clone(),
                    address,
                    balance: *balance,
                }),
                Err(ResolveError::Unavailable(reason)) => {
                    return Err(SettlementError::ResolverUnavailable(reason));
                }
                Err(e) => {
                    tracing::warn!(
                        channel_id = %settlement.channel_id,
                        agent_id = %agent_id,
                        error = %e,
                        "skipping settlement recipient"
                    );
                    skipped.push(agent_id.clone());
                }
            }
        }

        Ok((recipients, skipped))
    }
}
