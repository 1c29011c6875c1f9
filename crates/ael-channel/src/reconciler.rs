use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::context::OpContext;
use crate::engine::{ChannelEngine, SettlementOutcome};

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Another pass was still running; this one did nothing.
    pub skipped: bool,
    pub attempted: usize,
    pub settled: usize,
    pub retry_pending: usize,
    /// The escrow call's result was lost; left for an operator.
    pub unconfirmed: usize,
    /// Claim lost, deadline hit, or store failure.
    pub failed: usize,
}

/// Background task that re-attempts settlements left in `closing`.
///
/// Passes never overlap. Each channel runs on its own task under its own
/// timeout, so one slow escrow call does not hold up the rest of the pass.
pub struct SettlementReconciler {
    engine: Arc<dyn ChannelEngine>,
    interval: Duration,
    unit_timeout: Duration,
    running: Mutex<()>,
}

impl SettlementReconciler {
    pub fn new(engine: Arc<dyn ChannelEngine>, interval: Duration, unit_timeout: Duration) -> Self {
        Self {
            engine,
            interval,
            unit_timeout,
            running: Mutex::new(()),
        }
    }

    /// Run one pass now.
    pub async fn run_once(&self) -> ReconcileReport {
        let Ok(_pass) = self.running.try_lock() else {
            tracing::debug!("settlement reconciliation already running, skipping tick");
            return ReconcileReport {
                skipped: true,
                ..Default::default()
            };
        };

        let mut report = ReconcileReport::default();
        let pending = match self.engine.pending_settlements(&OpContext::background()).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to list pending settlements");
                return report;
            }
        };
        if pending.is_empty() {
            return report;
        }
        tracing::info!(count = pending.len(), "reconciling pending settlements");

        let mut units = JoinSet::new();
        for channel in pending {
            let engine = self.engine.clone();
            let ctx = OpContext::with_timeout(self.unit_timeout);
            units.spawn(async move {
                let result = engine.retry_settlement(&ctx, &channel.channel_id).await;
                (channel.channel_id, result)
            });
        }

        while let Some(joined) = units.join_next().await {
            report.attempted += 1;
            match joined {
                Ok((_, Ok(SettlementOutcome::RetryPending { .. }))) => report.retry_pending += 1,
                Ok((channel_id, Ok(SettlementOutcome::Unconfirmed { reason, .. }))) => {
                    tracing::error!(
                        channel_id = %channel_id,
                        error = %reason,
                        "settlement outcome unknown, manual resolution required"
                    );
                    report.unconfirmed += 1;
                }
                Ok((_, Ok(_))) => report.settled += 1,
                Ok((channel_id, Err(e))) => {
                    tracing::warn!(channel_id = %channel_id, error = %e, "settlement retry failed");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "settlement retry task panicked");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            settled = report.settled,
            retry_pending = report.retry_pending,
            unconfirmed = report.unconfirmed,
            failed = report.failed,
            "settlement reconciliation pass finished"
        );
        report
    }

    /// Tick until `shutdown` flips to `true`, then wait for the current pass.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut current: Option<tokio::task::JoinHandle<ReconcileReport>> = None;

        tracing::info!(interval_secs = self.interval.as_secs(), "settlement reconciler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let this = self.clone();
                    current = Some(tokio::spawn(async move { this.run_once().await }));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(pass) = current {
            let _ = pass.await;
        }
        tracing::info!("settlement reconciler stopped");
    }
}
