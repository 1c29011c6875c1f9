//! Integration test: the engine on the RocksDB ledger.
//!
//! Same scenarios as the in-memory runs, plus durability of balances,
//! transaction logs and pending settlements across a reopen.

use ael_channel::{ChannelEngine, EngineConfig, OpContext, SettlementOutcome};
use ael_core::{ChannelStatus, SettlementState};
use ael_integration_tests::{Harness, TempDir, XorShift};
use rust_decimal::Decimal;

fn rocks_harness(dir: &TempDir, agents: &[&str]) -> Harness {
    Harness::build(dir.open_ledger(), true, agents, EngineConfig::default())
}

#[tokio::test]
async fn test_reference_scenario_on_rocksdb() {
    let dir = TempDir::new("ael-rocks-ref");
    let h = rocks_harness(&dir, &["a", "b"]);

    h.open("ch_ref", &["a", "b"], Decimal::from(10)).await;
    h.send("ch_ref", "a", "b", 2500).await.unwrap();
    assert!(h.send("ch_ref", "b", "a", 5000).await.is_err());
    h.assert_conserved("ch_ref").await;

    let receipt = h
        .engine
        .close_channel(&OpContext::background(), "ch_ref")
        .await
        .unwrap();
    assert!(matches!(receipt.outcome, SettlementOutcome::Submitted { .. }));
    assert_eq!(receipt.settlement.usdc_owed["a"], Decimal::new(75, 1));
    assert_eq!(receipt.settlement.usdc_owed["b"], Decimal::new(25, 1));
    assert_eq!(h.channel("ch_ref").await.status, ChannelStatus::Settled);
    assert_eq!(h.escrow().settle_calls()[0].balances, vec![7500, 2500]);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new("ael-rocks-reopen");
    {
        let h = rocks_harness(&dir, &["a", "b", "c"]);
        h.open("ch_keep", &["a", "b", "c"], Decimal::from(3)).await;
        h.send("ch_keep", "a", "b", 1200).await.unwrap();
        h.send("ch_keep", "b", "c", 200).await.unwrap();
        h.engine
            .topup_credits(&OpContext::background(), "ch_keep", "c", 100)
            .await
            .unwrap();
    }

    let h = rocks_harness(&dir, &["a", "b", "c"]);
    let ch = h.channel("ch_keep").await;
    assert_eq!(ch.status, ChannelStatus::Active);
    assert_eq!(ch.total_credits_minted, 3100);
    assert_eq!(ch.total_transactions, 2);

    let balances = h.balances("ch_keep").await;
    assert_eq!(balances["a"], 1800);
    assert_eq!(balances["b"], 1000);
    assert_eq!(balances["c"], 300);
    h.assert_conserved("ch_keep").await;

    let txs = h
        .engine
        .list_transactions(&OpContext::background(), "ch_keep")
        .await
        .unwrap();
    let amounts: Vec<u64> = txs.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![1200, 200]);

    // The reopened ledger keeps accepting work.
    h.send("ch_keep", "c", "a", 300).await.unwrap();
    assert_eq!(h.balances("ch_keep").await["c"], 0);
}

#[tokio::test]
async fn test_pending_settlement_survives_reopen() {
    let dir = TempDir::new("ael-rocks-pending");
    {
        let h = rocks_harness(&dir, &["a", "b"]);
        h.open("ch_pend", &["a", "b"], Decimal::from(1)).await;
        h.send("ch_pend", "a", "b", 250).await.unwrap();
        h.escrow().fail_next("rpc unavailable");
        let receipt = h
            .engine
            .close_channel(&OpContext::background(), "ch_pend")
            .await
            .unwrap();
        assert!(matches!(receipt.outcome, SettlementOutcome::RetryPending { .. }));
    }

    let h = rocks_harness(&dir, &["a", "b"]);
    let ctx = OpContext::background();
    let ch = h.channel("ch_pend").await;
    assert_eq!(ch.status, ChannelStatus::Closing);
    assert!(matches!(ch.settlement_state, SettlementState::RetryPending { .. }));

    let pending = h.engine.pending_settlements(&ctx).await.unwrap();
    assert_eq!(pending.len(), 1);

    let outcome = h.engine.retry_settlement(&ctx, "ch_pend").await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Submitted { .. }));
    assert_eq!(h.escrow().settle_calls()[0].balances, vec![750, 250]);
    assert_eq!(h.channel("ch_pend").await.status, ChannelStatus::Settled);
    assert!(h.engine.pending_settlements(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_conservation_on_rocksdb() {
    let dir = TempDir::new("ael-rocks-cons");
    let agents = ["a", "b", "c"];
    let h = rocks_harness(&dir, &agents);
    h.open("ch_cons", &agents, Decimal::from(2)).await;
    let mut rng = XorShift::new(42);

    for _ in 0..150 {
        let from = agents[rng.below(3) as usize];
        let to = agents[rng.below(3) as usize];
        let _ = h.send("ch_cons", from, to, rng.below(900) + 1).await;
    }
    h.assert_conserved("ch_cons").await;

    let close = h
        .engine
        .close_channel(&OpContext::background(), "ch_cons")
        .await
        .unwrap();
    assert_eq!(close.settlement.total_owed(), Decimal::from(2));
}

#[tokio::test]
async fn test_event_log_survives_reopen() {
    let dir = TempDir::new("ael-rocks-events");
    {
        let h = rocks_harness(&dir, &["a", "b"]);
        h.open("ch_log", &["a", "b"], Decimal::from(1)).await;
        h.send("ch_log", "a", "b", 100).await.unwrap();
        assert!(h.send("ch_log", "b", "a", 5000).await.is_err());
    }

    let h = rocks_harness(&dir, &["a", "b"]);
    let ctx = OpContext::background();
    h.engine.close_channel(&ctx, "ch_log").await.unwrap();

    let events = h.engine.list_events(&ctx, Some("ch_log"), 0).await.unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["channel_settled", "channel_closing", "tx_confirmed", "channel_created"]
    );
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![4, 3, 2, 1]);
    assert_eq!(events[2].payload["amount"], 100);

    assert_eq!(h.engine.list_events(&ctx, None, 2).await.unwrap().len(), 2);
    assert!(h.engine.list_events(&ctx, Some("ch_none"), 0).await.unwrap().is_empty());
}
