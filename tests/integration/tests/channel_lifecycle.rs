//! Integration test: the channel lifecycle end to end.
//!
//! Drives create → transfer → close through the engine with the in-memory
//! ledger, escrow and event hub wired together.

use ael_channel::{ChannelEngine, ChannelError, OpContext, SettlementOutcome};
use ael_core::{ChannelStatus, SettlementState};
use ael_integration_tests::{address_of, Harness};
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::TryRecvError;

// =========================================================================
// Reference scenario: [a, b], deposit 10, ratio 1000
// =========================================================================

#[tokio::test]
async fn test_reference_scenario() {
    let h = Harness::memory(&["a", "b"]);

    // Create: full mint to the first participant.
    let ch = h.open("ch_ref", &["a", "b"], Decimal::from(10)).await;
    assert_eq!(ch.status, ChannelStatus::Active);
    assert!(ch.opened_at.is_some());
    assert_eq!(ch.total_credits_minted, 10_000);
    let balances = h.balances("ch_ref").await;
    assert_eq!(balances["a"], 10_000);
    assert_eq!(balances["b"], 0);

    // Transfer.
    h.send("ch_ref", "a", "b", 2500).await.unwrap();
    let balances = h.balances("ch_ref").await;
    assert_eq!(balances["a"], 7500);
    assert_eq!(balances["b"], 2500);
    assert_eq!(h.channel("ch_ref").await.total_transactions, 1);

    // Overdraw leaves everything untouched.
    let err = h.send("ch_ref", "b", "a", 5000).await.unwrap_err();
    assert!(matches!(
        err,
        ChannelError::InsufficientBalance {
            available: 2500,
            required: 5000,
            ..
        }
    ));
    let balances = h.balances("ch_ref").await;
    assert_eq!(balances["a"], 7500);
    assert_eq!(balances["b"], 2500);
    assert_eq!(h.channel("ch_ref").await.total_transactions, 1);

    // Close.
    let receipt = h
        .engine
        .close_channel(&OpContext::background(), "ch_ref")
        .await
        .unwrap();
    let stl = &receipt.settlement;
    assert_eq!(stl.balances["a"], 7500);
    assert_eq!(stl.balances["b"], 2500);
    assert_eq!(stl.usdc_owed["a"], Decimal::new(75, 1));
    assert_eq!(stl.usdc_owed["b"], Decimal::new(25, 1));
    assert_eq!(stl.total_usdc, Decimal::from(10));
    assert_eq!(stl.total_transactions, 1);
    assert_eq!(stl.unallocated(), Decimal::ZERO);
    assert!(matches!(receipt.outcome, SettlementOutcome::Submitted { .. }));

    let ch = h.channel("ch_ref").await;
    assert_eq!(ch.status, ChannelStatus::Settled);
    assert!(ch.closed_at.is_some());
    assert_eq!(ch.settlement.as_ref(), Some(stl));

    // Exactly one batched escrow call, balances in agent order.
    let calls = h.escrow().settle_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].channel_id, "ch_ref");
    assert_eq!(calls[0].addresses, vec![address_of("a"), address_of("b")]);
    assert_eq!(calls[0].balances, vec![7500, 2500]);
}

#[tokio::test]
async fn test_close_without_escrow_settles_degraded() {
    let h = Harness::degraded(&["a", "b"]);
    h.open("ch_deg", &["a", "b"], Decimal::from(10)).await;
    h.send("ch_deg", "a", "b", 1).await.unwrap();

    let receipt = h
        .engine
        .close_channel(&OpContext::background(), "ch_deg")
        .await
        .unwrap();
    assert_eq!(receipt.outcome, SettlementOutcome::Degraded);

    let ch = h.channel("ch_deg").await;
    assert_eq!(ch.status, ChannelStatus::Settled);
    assert_eq!(ch.settlement_state, SettlementState::Degraded);
}

// =========================================================================
// Lifecycle guards
// =========================================================================

#[tokio::test]
async fn test_closed_channel_rejects_every_mutation() {
    let h = Harness::memory(&["a", "b"]);
    h.open("ch_done", &["a", "b"], Decimal::from(1)).await;
    let ctx = OpContext::background();
    h.engine.close_channel(&ctx, "ch_done").await.unwrap();

    assert!(matches!(
        h.send("ch_done", "a", "b", 1).await,
        Err(ChannelError::Conflict(_))
    ));
    assert!(matches!(
        h.engine.topup_credits(&ctx, "ch_done", "a", 10).await,
        Err(ChannelError::Conflict(_))
    ));
    assert!(matches!(
        h.engine.close_channel(&ctx, "ch_done").await,
        Err(ChannelError::Conflict(_))
    ));
    assert_eq!(h.escrow().settle_calls().len(), 1);
    assert!(h.engine.list_transactions(&ctx, "ch_done").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_channel_and_participant() {
    let h = Harness::memory(&["a", "b"]);
    let ctx = OpContext::background();
    assert!(matches!(
        h.engine.get_channel(&ctx, "missing").await,
        Err(ChannelError::NotFound(_))
    ));
    assert!(matches!(
        h.engine.close_channel(&ctx, "missing").await,
        Err(ChannelError::NotFound(_))
    ));

    h.open("ch_np", &["a", "b"], Decimal::from(1)).await;
    assert!(matches!(
        h.send("ch_np", "a", "mallory", 1).await,
        Err(ChannelError::NotFound(_))
    ));
    assert!(matches!(
        h.engine.topup_credits(&ctx, "ch_np", "mallory", 10).await,
        Err(ChannelError::NotFound(_))
    ));
    h.assert_conserved("ch_np").await;
}

#[tokio::test]
async fn test_topup_then_settle_owes_topped_up_value() {
    let h = Harness::memory(&["a", "b"]);
    h.open("ch_top", &["a", "b"], Decimal::from(2)).await;
    let ctx = OpContext::background();

    let receipt = h.engine.topup_credits(&ctx, "ch_top", "b", 500).await.unwrap();
    assert_eq!(receipt.usdc_added, Decimal::new(5, 1));
    assert_eq!(receipt.total_credits_minted, 2500);
    h.assert_conserved("ch_top").await;

    let close = h.engine.close_channel(&ctx, "ch_top").await.unwrap();
    assert_eq!(close.settlement.total_usdc, Decimal::new(25, 1));
    assert_eq!(close.settlement.total_owed(), Decimal::new(25, 1));
}

#[tokio::test]
async fn test_history_and_listing() {
    let h = Harness::memory(&["a", "b", "c"]);
    h.open("ch_l1", &["a", "b"], Decimal::from(1)).await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    h.open("ch_l2", &["a", "b", "c"], Decimal::from(1)).await;
    for amount in [10, 20, 30] {
        h.send("ch_l2", "a", "c", amount).await.unwrap();
    }

    let ctx = OpContext::background();
    let txs = h.engine.list_transactions(&ctx, "ch_l2").await.unwrap();
    let amounts: Vec<u64> = txs.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![10, 20, 30]);

    let listed = h.engine.list_channels(&ctx, 0).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].channel.channel_id, "ch_l2");
    assert_eq!(listed[0].participant_count, 3);

    let limited = h.engine.list_channels(&ctx, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

// =========================================================================
// Events
// =========================================================================

#[tokio::test]
async fn test_events_follow_commit_order() {
    let h = Harness::memory(&["a", "b"]);
    let mut global = h.hub.subscribe_global();

    h.open("ch_ev", &["a", "b"], Decimal::from(1)).await;
    let mut per_channel = h.hub.subscribe("ch_ev");
    let mut other = h.hub.subscribe("ch_other");

    h.send("ch_ev", "a", "b", 100).await.unwrap();
    let ctx = OpContext::background();
    h.engine.topup_credits(&ctx, "ch_ev", "b", 50).await.unwrap();
    // A rejected transfer publishes nothing.
    let _ = h.send("ch_ev", "b", "a", 1_000_000).await;
    h.engine.close_channel(&ctx, "ch_ev").await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(env) = global.try_recv() {
        assert_eq!(env.channel_id, "ch_ev");
        kinds.push(env.event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "channel_created",
            "tx_confirmed",
            "credits_topped_up",
            "channel_closing",
            "channel_settled",
        ]
    );

    // The durable log holds the same events, newest first.
    let mut logged: Vec<String> = h
        .engine
        .list_events(&ctx, Some("ch_ev"), 0)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.kind)
        .collect();
    logged.reverse();
    assert_eq!(logged, kinds);

    let first = per_channel.try_recv().unwrap();
    assert_eq!(first.event.kind(), "tx_confirmed");
    let wire = serde_json::to_value(&first).unwrap();
    assert_eq!(wire["type"], "tx_confirmed");
    assert_eq!(wire["payload"]["amount"], 100);

    assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_failed_settlement_event_then_retry_event() {
    let h = Harness::memory(&["a"]);
    h.open("ch_evr", &["a"], Decimal::from(1)).await;
    let mut rx = h.hub.subscribe("ch_evr");

    h.escrow().fail_next("rpc unavailable");
    let ctx = OpContext::background();
    let receipt = h.engine.close_channel(&ctx, "ch_evr").await.unwrap();
    assert!(matches!(receipt.outcome, SettlementOutcome::RetryPending { .. }));
    assert_eq!(h.channel("ch_evr").await.status, ChannelStatus::Closing);

    h.engine.retry_settlement(&ctx, "ch_evr").await.unwrap();

    let kinds: Vec<&str> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| e.event.kind())
        .collect();
    assert_eq!(
        kinds,
        vec!["channel_closing", "settlement_retry_pending", "channel_settled"]
    );
}
