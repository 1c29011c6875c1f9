use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ael_core::{
    Channel, ChannelMode, ChannelStateMachine, ChannelStatus, CreateChannelRequest, CreditBalance,
    EventRecord, LedgerConfig, LifecycleEvent, Participant, Settlement, SettlementState,
    TransactionRecord, TxRequest, TxResult, TxStatus, DEFAULT_CHANNEL_TYPE,
};
use ael_events::{ChannelEvent, EventEnvelope, EventPublisher};
use ael_ledger::{ChannelSummary, LedgerStore, LedgerTxn};
use ael_settlement::{SettleReceipt, Settler};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::context::OpContext;
use crate::engine::{ChannelEngine, CloseReceipt, SettlementOutcome, TopupReceipt};
use crate::error::ChannelError;

/// Listing size used when a caller asks for zero.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Immutable engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ledger: LedgerConfig,
    /// Bound on one settlement attempt, independent of the caller's deadline.
    pub settlement_timeout: Duration,
    /// Age after which an in-flight settlement claim may be taken over.
    pub stale_claim_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            settlement_timeout: Duration::from_secs(15),
            stale_claim_after: Duration::from_secs(300),
        }
    }
}

/// Ledger-backed engine for `lite` channels.
///
/// Holds no channel state between calls: every mutation re-reads the channel
/// through [`LedgerStore::begin`], which serializes writers per channel, and
/// commits all of its changes at once. Each mutation's event is written to the
/// event log by that same commit and published to live subscribers after it.
/// The settlement orchestrator is called only after the owning commit.
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    settler: Arc<Settler>,
    events: Arc<dyn EventPublisher>,
    config: EngineConfig,
}

impl LedgerEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        settler: Arc<Settler>,
        events: Arc<dyn EventPublisher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            settler,
            events,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn settler(&self) -> &Arc<Settler> {
        &self.settler
    }

    fn publish(&self, envelope: EventEnvelope) {
        self.events.publish(envelope);
    }

    fn stale_after(&self) -> Result<chrono::Duration, ChannelError> {
        chrono::Duration::from_std(self.config.stale_claim_after)
            .map_err(|e| ChannelError::Internal(format!("stale claim window: {e}")))
    }

    /// Run one settlement attempt on its own task so that a caller giving up
    /// cannot leave a claim half-recorded.
    async fn spawn_attempt(
        &self,
        settlement: Settlement,
        attempt: u32,
    ) -> Result<SettlementOutcome, ChannelError> {
        let this = self.clone();
        detached(async move { this.attempt_settlement(settlement, attempt).await }).await
    }

    async fn attempt_settlement(
        &self,
        settlement: Settlement,
        attempt: u32,
    ) -> Result<SettlementOutcome, ChannelError> {
        let timeout = self.config.settlement_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        let retry = |reason: String| SettlementOutcome::RetryPending {
            reason,
            attempts: attempt,
        };

        let outcome = match tokio::time::timeout_at(deadline, self.settler.prepare(&settlement)).await {
            Ok(Ok(plan)) => {
                // The escrow may act on the call from here on; only a definite
                // rejection is retryable.
                let submitted =
                    tokio::time::timeout_at(deadline, self.settler.submit(&settlement, plan)).await;
                match submitted {
                    Ok(Ok(SettleReceipt::Submitted { tx_ref, .. })) => {
                        SettlementOutcome::Submitted { tx_ref }
                    }
                    Ok(Ok(SettleReceipt::Degraded)) => SettlementOutcome::Degraded,
                    Ok(Err(e)) if e.is_ambiguous() => SettlementOutcome::Unconfirmed {
                        reason: e.to_string(),
                        attempts: attempt,
                    },
                    Ok(Err(e)) => retry(e.to_string()),
                    Err(_) => SettlementOutcome::Unconfirmed {
                        reason: format!("escrow call timed out after {}ms", timeout.as_millis()),
                        attempts: attempt,
                    },
                }
            }
            Ok(Err(e)) => retry(e.to_string()),
            Err(_) => retry(format!(
                "settlement preparation timed out after {}ms",
                timeout.as_millis()
            )),
        };

        if let Some(envelope) = self.record_outcome(&settlement, attempt, &outcome).await? {
            self.publish(envelope);
        }
        Ok(outcome)
    }

    /// Write an attempt's outcome if the attempt still holds the claim.
    /// Returns the committed event for publishing.
    async fn record_outcome(
        &self,
        settlement: &Settlement,
        attempt: u32,
        outcome: &SettlementOutcome,
    ) -> Result<Option<EventEnvelope>, ChannelError> {
        let channel_id = settlement.channel_id.as_str();
        let mut txn = self.store.begin(channel_id).await?;
        let holds_claim = txn.channel().status == ChannelStatus::Closing
            && matches!(
                txn.channel().settlement_state,
                SettlementState::InFlight { attempt: a, .. } if a == attempt
            );
        if !holds_claim {
            tracing::warn!(
                channel_id = %channel_id,
                attempt,
                state = ?txn.channel().settlement_state,
                "settlement claim superseded, outcome not recorded"
            );
            return Ok(None);
        }

        let ch = txn.channel_mut();
        let event = match outcome {
            SettlementOutcome::Submitted { tx_ref } => {
                ch.status = ChannelStateMachine::transition(ch.status, LifecycleEvent::SettlementFinalized)?;
                ch.settlement_state = SettlementState::Submitted {
                    tx_ref: tx_ref.clone(),
                    attempt,
                };
                tracing::info!(channel_id = %channel_id, tx_ref = %tx_ref, attempt, "channel settled");
                ChannelEvent::ChannelSettled {
                    settlement: settlement.clone(),
                    settle_tx_hash: Some(tx_ref.clone()),
                    degraded: false,
                }
            }
            SettlementOutcome::Degraded => {
                ch.status = ChannelStateMachine::transition(ch.status, LifecycleEvent::SettlementFinalized)?;
                ch.settlement_state = SettlementState::Degraded;
                tracing::info!(channel_id = %channel_id, "channel settled off-chain only (no escrow)");
                ChannelEvent::ChannelSettled {
                    settlement: settlement.clone(),
                    settle_tx_hash: None,
                    degraded: true,
                }
            }
            SettlementOutcome::RetryPending { reason, attempts } => {
                ch.settlement_state = SettlementState::RetryPending {
                    attempts: *attempts,
                    last_error: reason.clone(),
                };
                tracing::warn!(
                    channel_id = %channel_id,
                    attempts,
                    error = %reason,
                    "settlement failed, channel stays closing"
                );
                ChannelEvent::SettlementRetryPending {
                    attempts: *attempts,
                    reason: reason.clone(),
                }
            }
            SettlementOutcome::Unconfirmed { reason, attempts } => {
                ch.settlement_state = SettlementState::Unconfirmed {
                    attempt: *attempts,
                    reason: reason.clone(),
                    since: Utc::now(),
                };
                tracing::error!(
                    channel_id = %channel_id,
                    attempts,
                    error = %reason,
                    "escrow settle call outcome unknown, channel needs manual resolution"
                );
                ChannelEvent::SettlementUnconfirmed {
                    attempts: *attempts,
                    reason: reason.clone(),
                }
            }
        };
        let envelope = stage_event(&mut txn, channel_id, event)?;
        self.store.commit(txn).await?;
        Ok(Some(envelope))
    }
}

#[async_trait]
impl ChannelEngine for LedgerEngine {
    fn mode(&self) -> ChannelMode {
        ChannelMode::Lite
    }

    fn ledger_config(&self) -> &LedgerConfig {
        &self.config.ledger
    }

    async fn create_channel(
        &self,
        ctx: &OpContext,
        req: CreateChannelRequest,
    ) -> Result<Channel, ChannelError> {
        if req.mode != ChannelMode::Lite {
            return Err(ChannelError::InvalidRequest(format!(
                "mode {} is not served by this engine",
                req.mode
            )));
        }
        let agents = validate_participants(&req.participants)?;
        let max = match req.max_participants {
            0 => self.config.ledger.default_max_participants,
            n => n,
        };
        if agents.len() > max as usize {
            return Err(ChannelError::InvalidRequest(format!(
                "{} participants exceed the cap of {max}",
                agents.len()
            )));
        }
        let credits = self.config.ledger.credit_ratio.mint(req.usdc_amount)?;
        if credits == 0 {
            return Err(ChannelError::InvalidRequest(format!(
                "deposit {} mints no credits",
                req.usdc_amount
            )));
        }
        let channel_id = match req.channel_id.as_deref().map(str::trim) {
            Some("") => {
                return Err(ChannelError::InvalidRequest("channel_id is empty".into()));
            }
            Some(id) => id.to_string(),
            None => format!("ch_{}", Uuid::now_v7().simple()),
        };

        let mut channel = Channel::new_pending(channel_id.clone(), ChannelMode::Lite, max);
        channel.channel_type = match req.channel_type.trim() {
            "" => DEFAULT_CHANNEL_TYPE.to_string(),
            t => t.to_string(),
        };
        channel.total_usdc_deposited = req.usdc_amount;
        channel.total_credits_minted = credits;

        // The first listed participant receives the whole initial mint.
        let rows: Vec<Participant> = agents
            .iter()
            .enumerate()
            .map(|(i, agent)| Participant {
                channel_id: channel_id.clone(),
                agent_id: agent.clone(),
                balance: if i == 0 { credits } else { 0 },
            })
            .collect();

        ctx.run(async {
            self.store
                .insert_channel(channel, rows)
                .await
                .map_err(ChannelError::from)
        })
        .await
        .inspect_err(|e| tracing::debug!(channel_id = %channel_id, error = %e, "create rejected"))?;

        // The row exists from here on; opening it is not abandoned with the caller.
        let store = self.store.clone();
        let id = channel_id.clone();
        let (opened, envelope) =
            detached(async move { open_channel(store.as_ref(), &id).await }).await?;

        tracing::info!(
            channel_id = %channel_id,
            participants = agents.len(),
            credits,
            usdc = %opened.total_usdc_deposited,
            channel_type = %opened.channel_type,
            "channel opened"
        );
        self.publish(envelope);
        Ok(opened)
    }

    async fn get_channel(&self, ctx: &OpContext, channel_id: &str) -> Result<Channel, ChannelError> {
        ctx.run(async {
            self.store
                .get_channel(channel_id)
                .await?
                .ok_or_else(|| ChannelError::NotFound(format!("channel {channel_id}")))
        })
        .await
    }

    async fn send_transaction(
        &self,
        ctx: &OpContext,
        channel_id: &str,
        req: TxRequest,
    ) -> Result<TxResult, ChannelError> {
        validate_transfer(&req)?;
        let started = Instant::now();

        let (record, envelope) = ctx
            .run(async {
                let mut txn = self.store.begin(channel_id).await?;
                let status = txn.channel().status;
                if !status.accepts_mutations() {
                    return Err(ChannelError::Conflict(format!("channel {channel_id} is {status}")));
                }
                let available = txn
                    .balance_of(&req.from)
                    .ok_or_else(|| not_a_participant(channel_id, &req.from))?;
                if txn.balance_of(&req.to).is_none() {
                    return Err(not_a_participant(channel_id, &req.to));
                }
                if available < req.amount {
                    return Err(ChannelError::InsufficientBalance {
                        agent_id: req.from.clone(),
                        available,
                        required: req.amount,
                    });
                }

                if let Some(p) = txn.participant_mut(&req.from) {
                    p.balance -= req.amount;
                }
                if let Some(p) = txn.participant_mut(&req.to) {
                    p.balance += req.amount;
                }
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                txn.channel_mut().record_transaction(latency_ms);

                let record = TransactionRecord {
                    tx_id: format!("tx_{}", Uuid::now_v7().simple()),
                    channel_id: channel_id.to_string(),
                    from: req.from.clone(),
                    to: req.to.clone(),
                    amount: req.amount,
                    memo: req.memo.clone(),
                    status: TxStatus::Confirmed,
                    latency_ms,
                    created_at: Utc::now(),
                };
                txn.append_transaction(record.clone());
                let envelope =
                    stage_event(&mut txn, channel_id, ChannelEvent::TxConfirmed(record.clone()))?;
                self.store.commit(txn).await?;
                Ok((record, envelope))
            })
            .await
            .inspect_err(|e| {
                tracing::debug!(channel_id = %channel_id, from = %req.from, to = %req.to, error = %e, "transfer rejected")
            })?;

        tracing::debug!(
            channel_id = %channel_id,
            tx_id = %record.tx_id,
            amount = record.amount,
            latency_ms = record.latency_ms,
            "transfer confirmed"
        );
        self.publish(envelope);
        Ok(record)
    }

    async fn topup_credits(
        &self,
        ctx: &OpContext,
        channel_id: &str,
        agent_id: &str,
        amount: u64,
    ) -> Result<TopupReceipt, ChannelError> {
        if amount == 0 {
            return Err(ChannelError::InvalidRequest("top-up amount must be positive".into()));
        }
        let usdc_added = self.config.ledger.credit_ratio.to_currency(amount);

        let (receipt, envelope) = ctx
            .run(async {
                let mut txn = self.store.begin(channel_id).await?;
                if txn.balance_of(agent_id).is_none() {
                    return Err(not_a_participant(channel_id, agent_id));
                }
                let status = txn.channel().status;
                if !status.accepts_mutations() {
                    return Err(ChannelError::Conflict(format!("channel {channel_id} is {status}")));
                }

                let minted = txn
                    .channel()
                    .total_credits_minted
                    .checked_add(amount)
                    .ok_or_else(|| ChannelError::InvalidRequest("top-up overflows channel supply".into()))?;
                let mut balance = 0;
                if let Some(p) = txn.participant_mut(agent_id) {
                    p.balance += amount;
                    balance = p.balance;
                }
                let ch = txn.channel_mut();
                ch.total_credits_minted = minted;
                ch.total_usdc_deposited += usdc_added;

                let envelope = stage_event(
                    &mut txn,
                    channel_id,
                    ChannelEvent::CreditsToppedUp {
                        agent_id: agent_id.to_string(),
                        credits_added: amount,
                        usdc_added,
                    },
                )?;
                self.store.commit(txn).await?;
                let receipt = TopupReceipt {
                    channel_id: channel_id.to_string(),
                    agent_id: agent_id.to_string(),
                    credits_added: amount,
                    usdc_added,
                    balance,
                    total_credits_minted: minted,
                };
                Ok((receipt, envelope))
            })
            .await
            .inspect_err(|e| {
                tracing::debug!(channel_id = %channel_id, agent_id = %agent_id, error = %e, "top-up rejected")
            })?;

        tracing::info!(
            channel_id = %channel_id,
            agent_id = %agent_id,
            credits = amount,
            usdc = %usdc_added,
            "credits topped up"
        );
        self.publish(envelope);
        Ok(receipt)
    }

    async fn close_channel(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<CloseReceipt, ChannelError> {
        let ratio = self.config.ledger.credit_ratio;

        // Freezing balances and claiming the first attempt is one commit.
        let (settlement, envelope) = ctx
            .run(async {
                let mut txn = self.store.begin(channel_id).await?;
                let current = txn.channel().status;
                let next = ChannelStateMachine::transition(current, LifecycleEvent::CloseRequested)
                    .map_err(|_| ChannelError::Conflict(format!("channel {channel_id} is {current}")))?;
                let settlement = Settlement::compute(txn.channel(), txn.participants(), &ratio);

                let now = Utc::now();
                let ch = txn.channel_mut();
                ch.status = next;
                ch.closed_at = Some(now);
                ch.settlement = Some(settlement.clone());
                ch.settlement_state = SettlementState::InFlight {
                    claimed_at: now,
                    attempt: 1,
                };
                let envelope = stage_event(
                    &mut txn,
                    channel_id,
                    ChannelEvent::ChannelClosing {
                        settlement: settlement.clone(),
                    },
                )?;
                self.store.commit(txn).await?;
                Ok::<_, ChannelError>((settlement, envelope))
            })
            .await
            .inspect_err(|e| tracing::debug!(channel_id = %channel_id, error = %e, "close rejected"))?;

        tracing::info!(
            channel_id = %channel_id,
            total_credits = settlement.total_credits,
            total_usdc = %settlement.total_usdc,
            unallocated = %settlement.unallocated(),
            "channel closing, balances frozen"
        );
        self.publish(envelope);

        let outcome = self.spawn_attempt(settlement.clone(), 1).await?;
        Ok(CloseReceipt { settlement, outcome })
    }

    async fn get_balances(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<Vec<CreditBalance>, ChannelError> {
        ctx.run(async { self.store.get_participants(channel_id).await.map_err(ChannelError::from) })
            .await
    }

    async fn list_channels(
        &self,
        ctx: &OpContext,
        limit: usize,
    ) -> Result<Vec<ChannelSummary>, ChannelError> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        ctx.run(async { self.store.list_channels(limit).await.map_err(ChannelError::from) })
            .await
    }

    async fn list_transactions(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<Vec<TransactionRecord>, ChannelError> {
        ctx.run(async { self.store.list_transactions(channel_id).await.map_err(ChannelError::from) })
            .await
    }

    async fn list_events(
        &self,
        ctx: &OpContext,
        channel_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, ChannelError> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        ctx.run(async { self.store.list_events(channel_id, limit).await.map_err(ChannelError::from) })
            .await
    }

    async fn pending_settlements(&self, ctx: &OpContext) -> Result<Vec<Channel>, ChannelError> {
        let stale = self.stale_after()?;
        ctx.run(async {
            let now = Utc::now();
            let closing = self.store.channels_with_status(ChannelStatus::Closing).await?;
            Ok::<_, ChannelError>(
                closing
                    .into_iter()
                    .filter(|c| c.settlement_state.is_claimable(now, stale))
                    .collect(),
            )
        })
        .await
    }

    async fn retry_settlement(
        &self,
        ctx: &OpContext,
        channel_id: &str,
    ) -> Result<SettlementOutcome, ChannelError> {
        let stale = self.stale_after()?;
        let (settlement, attempt) = ctx
            .run(async {
                let mut txn = self.store.begin(channel_id).await?;
                let now = Utc::now();
                let ch = txn.channel();
                if ch.status != ChannelStatus::Closing {
                    return Err(ChannelError::Conflict(format!(
                        "channel {channel_id} is {}",
                        ch.status
                    )));
                }
                if !ch.settlement_state.is_claimable(now, stale) {
                    return Err(ChannelError::Conflict(format!(
                        "settlement of channel {channel_id} is not awaiting retry"
                    )));
                }
                let settlement = ch.settlement.clone().ok_or_else(|| {
                    ChannelError::Internal(format!("closing channel {channel_id} has no settlement"))
                })?;
                let attempt = ch.settlement_state.attempts() + 1;

                txn.channel_mut().settlement_state = SettlementState::InFlight {
                    claimed_at: now,
                    attempt,
                };
                self.store.commit(txn).await?;
                Ok((settlement, attempt))
            })
            .await?;

        tracing::info!(channel_id = %channel_id, attempt, "retrying settlement");
        self.spawn_attempt(settlement, attempt).await
    }

    async fn resolve_settlement(
        &self,
        ctx: &OpContext,
        channel_id: &str,
        reference: Option<String>,
    ) -> Result<Channel, ChannelError> {
        let stale = self.stale_after()?;
        let (channel, envelope) = ctx
            .run(async {
                let mut txn = self.store.begin(channel_id).await?;
                let ch = txn.channel();
                if ch.status != ChannelStatus::Closing {
                    return Err(ChannelError::Conflict(format!(
                        "channel {channel_id} is {}",
                        ch.status
                    )));
                }
                if matches!(ch.settlement_state, SettlementState::InFlight { .. })
                    && !ch.settlement_state.is_claimable(Utc::now(), stale)
                {
                    return Err(ChannelError::Conflict(format!(
                        "settlement of channel {channel_id} is in flight"
                    )));
                }

                let ch = txn.channel_mut();
                ch.status = ChannelStateMachine::transition(ch.status, LifecycleEvent::SettlementFinalized)?;
                ch.settlement_state = SettlementState::ManuallyResolved {
                    reference: reference.clone(),
                };
                let updated = ch.clone();
                let envelope = match updated.settlement.clone() {
                    Some(settlement) => Some(stage_event(
                        &mut txn,
                        channel_id,
                        ChannelEvent::ChannelSettled {
                            settlement,
                            settle_tx_hash: reference.clone(),
                            degraded: false,
                        },
                    )?),
                    None => None,
                };
                self.store.commit(txn).await?;
                Ok((updated, envelope))
            })
            .await?;

        tracing::warn!(
            channel_id = %channel_id,
            reference = ?reference,
            "settlement resolved manually"
        );
        if let Some(envelope) = envelope {
            self.publish(envelope);
        }
        Ok(channel)
    }
}

/// Move a freshly inserted channel from `pending` to `active`.
async fn open_channel(
    store: &dyn LedgerStore,
    channel_id: &str,
) -> Result<(Channel, EventEnvelope), ChannelError> {
    let mut txn = store.begin(channel_id).await?;
    let next = ChannelStateMachine::transition(txn.channel().status, LifecycleEvent::Opened)?;
    let ch = txn.channel_mut();
    ch.status = next;
    ch.opened_at = Some(Utc::now());
    let opened = ch.clone();
    let envelope = stage_event(&mut txn, channel_id, ChannelEvent::ChannelCreated(opened.clone()))?;
    store.commit(txn).await?;
    Ok((opened, envelope))
}

/// Stage `event` in the event log of `txn`. The returned envelope is for
/// publishing once the commit succeeds.
fn stage_event(
    txn: &mut LedgerTxn,
    channel_id: &str,
    event: ChannelEvent,
) -> Result<EventEnvelope, ChannelError> {
    let envelope = EventEnvelope::new(channel_id, event);
    let record = envelope
        .to_record()
        .map_err(|e| ChannelError::Internal(format!("event encoding: {e}")))?;
    txn.record_event(record);
    Ok(envelope)
}

/// Await `fut` on its own task; dropping the caller does not cancel it.
async fn detached<T, F>(fut: F) -> Result<T, ChannelError>
where
    F: Future<Output = Result<T, ChannelError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| ChannelError::Internal(format!("background task failed: {e}")))?
}

fn validate_participants(participants: &[String]) -> Result<Vec<String>, ChannelError> {
    if participants.is_empty() {
        return Err(ChannelError::InvalidRequest("participants must not be empty".into()));
    }
    let mut seen = HashSet::with_capacity(participants.len());
    let mut agents = Vec::with_capacity(participants.len());
    for raw in participants {
        let agent = raw.trim();
        if agent.is_empty() {
            return Err(ChannelError::InvalidRequest("participant id is empty".into()));
        }
        if !seen.insert(agent) {
            return Err(ChannelError::InvalidRequest(format!("duplicate participant {agent}")));
        }
        agents.push(agent.to_string());
    }
    Ok(agents)
}

fn validate_transfer(req: &TxRequest) -> Result<(), ChannelError> {
    if req.amount == 0 {
        return Err(ChannelError::InvalidRequest("amount must be positive".into()));
    }
    if req.from.trim().is_empty() || req.to.trim().is_empty() {
        return Err(ChannelError::InvalidRequest("from and to are required".into()));
    }
    if req.from == req.to {
        return Err(ChannelError::InvalidRequest("cannot transfer to self".into()));
    }
    Ok(())
}

fn not_a_participant(channel_id: &str, agent_id: &str) -> ChannelError {
    ChannelError::NotFound(format!("participant {agent_id} in channel {channel_id}"))
}
