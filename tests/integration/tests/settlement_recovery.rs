//! Integration test: settlement failure handling and recovery.
//!
//! Escrow failures, timeouts, unresolvable agents, crashed attempts, the
//! background reconciler and manual resolution, across the channel engine and
//! the settlement layer.

use std::sync::Arc;
use std::time::Duration;

use ael_channel::{ChannelEngine, ChannelError, OpContext, SettlementOutcome, SettlementReconciler};
use ael_core::{ChannelStatus, SettlementState};
use ael_integration_tests::{address_of, fast_config, Harness};
use ael_ledger::{LedgerStore, MemoryLedger};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_escrow_failure_keeps_channel_closing() {
    let h = Harness::memory(&["a", "b"]);
    h.open("ch_fail", &["a", "b"], Decimal::from(1)).await;
    h.escrow().fail_next("execution reverted");

    let receipt = h
        .engine
        .close_channel(&OpContext::background(), "ch_fail")
        .await
        .unwrap();
    match &receipt.outcome {
        SettlementOutcome::RetryPending { reason, attempts } => {
            assert!(reason.contains("execution reverted"));
            assert_eq!(*attempts, 1);
        }
        other => panic!("expected retry_pending, got {other:?}"),
    }

    let ch = h.channel("ch_fail").await;
    assert_eq!(ch.status, ChannelStatus::Closing);
    assert!(matches!(
        ch.settlement_state,
        SettlementState::RetryPending { attempts: 1, .. }
    ));
    assert!(h.escrow().settle_calls().is_empty());

    let pending = h
        .engine
        .pending_settlements(&OpContext::background())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].channel_id, "ch_fail");
}

#[tokio::test]
async fn test_lost_escrow_reply_is_never_paid_twice() {
    let h = Harness::build(
        Arc::new(MemoryLedger::new()),
        true,
        &["a"],
        fast_config(),
    );
    h.open("ch_slow", &["a"], Decimal::from(1)).await;
    h.escrow().set_delay(Some(Duration::from_secs(1)));

    let ctx = OpContext::background();
    let receipt = h.engine.close_channel(&ctx, "ch_slow").await.unwrap();
    match &receipt.outcome {
        SettlementOutcome::Unconfirmed { reason, attempts } => {
            assert!(reason.contains("timed out"));
            assert_eq!(*attempts, 1);
        }
        other => panic!("expected unconfirmed, got {other:?}"),
    }
    let ch = h.channel("ch_slow").await;
    assert_eq!(ch.status, ChannelStatus::Closing);
    assert!(matches!(ch.settlement_state, SettlementState::Unconfirmed { .. }));

    // The escrow may have paid out; nothing resubmits on its own.
    h.escrow().set_delay(None);
    assert!(matches!(
        h.engine.retry_settlement(&ctx, "ch_slow").await,
        Err(ChannelError::Conflict(_))
    ));
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(matches!(
        h.engine.retry_settlement(&ctx, "ch_slow").await,
        Err(ChannelError::Conflict(_))
    ));
    assert!(h.engine.pending_settlements(&ctx).await.unwrap().is_empty());

    let reconciler = SettlementReconciler::new(
        h.engine.clone(),
        Duration::from_secs(30),
        Duration::from_secs(5),
    );
    assert_eq!(reconciler.run_once().await.attempted, 0);
    assert_eq!(h.escrow().settle_attempts().len(), 1);

    let ch = h
        .engine
        .resolve_settlement(&ctx, "ch_slow", Some("0xfeed".into()))
        .await
        .unwrap();
    assert_eq!(ch.status, ChannelStatus::Settled);
    assert_eq!(
        ch.settlement_state,
        SettlementState::ManuallyResolved {
            reference: Some("0xfeed".into())
        }
    );
    assert_eq!(h.escrow().settle_attempts().len(), 1);
}

#[tokio::test]
async fn test_rejected_escrow_call_is_retried() {
    let h = Harness::memory(&["a"]);
    h.open("ch_again", &["a"], Decimal::from(1)).await;
    h.escrow().fail_next("execution reverted");

    let ctx = OpContext::background();
    let receipt = h.engine.close_channel(&ctx, "ch_again").await.unwrap();
    assert!(matches!(receipt.outcome, SettlementOutcome::RetryPending { .. }));

    let outcome = h.engine.retry_settlement(&ctx, "ch_again").await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Submitted { .. }));
    let ch = h.channel("ch_again").await;
    assert_eq!(ch.status, ChannelStatus::Settled);
    assert_eq!(ch.settlement_state.attempts(), 2);
    assert_eq!(h.escrow().settle_attempts().len(), 2);
    assert_eq!(h.escrow().settle_calls().len(), 1);
}

#[tokio::test]
async fn test_unresolvable_agents_are_skipped() {
    // Only "a" has a registered address.
    let h = Harness::memory(&["a"]);
    h.open("ch_skip", &["a", "b", "c"], Decimal::from(1)).await;
    h.send("ch_skip", "a", "b", 400).await.unwrap();

    let receipt = h
        .engine
        .close_channel(&OpContext::background(), "ch_skip")
        .await
        .unwrap();
    assert!(matches!(receipt.outcome, SettlementOutcome::Submitted { .. }));

    let calls = h.escrow().settle_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].addresses, vec![address_of("a")]);
    assert_eq!(calls[0].balances, vec![600]);
    // The settlement record still carries every participant.
    assert_eq!(receipt.settlement.balances.len(), 3);
}

#[tokio::test]
async fn test_no_resolvable_agent_needs_manual_resolution() {
    let h = Harness::memory(&[]);
    h.open("ch_orphan", &["x", "y"], Decimal::from(1)).await;
    let ctx = OpContext::background();

    let receipt = h.engine.close_channel(&ctx, "ch_orphan").await.unwrap();
    assert!(matches!(receipt.outcome, SettlementOutcome::RetryPending { .. }));
    assert!(h.escrow().settle_calls().is_empty());

    let ch = h
        .engine
        .resolve_settlement(&ctx, "ch_orphan", Some("paid-by-ops-ticket-42".into()))
        .await
        .unwrap();
    assert_eq!(ch.status, ChannelStatus::Settled);
    assert_eq!(
        ch.settlement_state,
        SettlementState::ManuallyResolved {
            reference: Some("paid-by-ops-ticket-42".into())
        }
    );

    // Settled channels cannot be resolved or retried again.
    assert!(matches!(
        h.engine.resolve_settlement(&ctx, "ch_orphan", None).await,
        Err(ChannelError::Conflict(_))
    ));
    assert!(matches!(
        h.engine.retry_settlement(&ctx, "ch_orphan").await,
        Err(ChannelError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_resolve_rejects_active_channel() {
    let h = Harness::memory(&["a"]);
    h.open("ch_live", &["a"], Decimal::from(1)).await;
    assert!(matches!(
        h.engine
            .resolve_settlement(&OpContext::background(), "ch_live", None)
            .await,
        Err(ChannelError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_reconciler_settles_every_pending_channel() {
    let h = Harness::memory(&["a", "b"]);
    let ctx = OpContext::background();
    for i in 0..3 {
        let id = format!("ch_rec_{i}");
        h.open(&id, &["a", "b"], Decimal::from(1)).await;
        h.escrow().fail_next("nonce too low");
        let receipt = h.engine.close_channel(&ctx, &id).await.unwrap();
        assert!(!receipt.outcome.is_settled());
    }
    // A healthy channel is never picked up.
    h.open("ch_rec_ok", &["a"], Decimal::from(1)).await;
    h.engine.close_channel(&ctx, "ch_rec_ok").await.unwrap();
    assert_eq!(h.escrow().settle_calls().len(), 1);

    let reconciler = SettlementReconciler::new(
        h.engine.clone(),
        Duration::from_secs(30),
        Duration::from_secs(5),
    );
    let report = reconciler.run_once().await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.settled, 3);
    assert_eq!(report.failed, 0);

    for i in 0..3 {
        let ch = h.channel(&format!("ch_rec_{i}")).await;
        assert_eq!(ch.status, ChannelStatus::Settled);
    }
    assert_eq!(h.escrow().settle_calls().len(), 4);

    let again = reconciler.run_once().await;
    assert_eq!(again.attempted, 0);
    assert_eq!(h.escrow().settle_calls().len(), 4);
}

#[tokio::test]
async fn test_crashed_attempt_is_taken_over_after_stale_window() {
    let h = Harness::build(
        Arc::new(MemoryLedger::new()),
        true,
        &["a"],
        fast_config(),
    );
    h.open("ch_crash", &["a"], Decimal::from(1)).await;
    let ctx = OpContext::background();
    h.escrow().fail_next("boom");
    h.engine.close_channel(&ctx, "ch_crash").await.unwrap();

    // Simulate a process that claimed the settlement and died before recording.
    let store = h.engine.store().clone();
    let mut txn = store.begin("ch_crash").await.unwrap();
    txn.channel_mut().settlement_state = SettlementState::InFlight {
        claimed_at: chrono::Utc::now(),
        attempt: 2,
    };
    store.commit(txn).await.unwrap();

    // A live claim is not claimable.
    assert!(matches!(
        h.engine.retry_settlement(&ctx, "ch_crash").await,
        Err(ChannelError::Conflict(_))
    ));
    assert!(matches!(
        h.engine.resolve_settlement(&ctx, "ch_crash", None).await,
        Err(ChannelError::Conflict(_))
    ));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let outcome = h.engine.retry_settlement(&ctx, "ch_crash").await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Submitted { .. }));

    let ch = h.channel("ch_crash").await;
    assert_eq!(ch.status, ChannelStatus::Settled);
    assert_eq!(ch.settlement_state.attempts(), 3);
    assert_eq!(h.escrow().settle_calls().len(), 1);
}
