//! Integration test: ledger invariants under randomized and concurrent load.
//!
//! Conservation, non-negative balances, single-writer ordering per channel,
//! and the at-most-once escrow call, checked across many operations.

use std::sync::Arc;

use ael_channel::{ChannelEngine, ChannelError, EngineConfig, OpContext};
use ael_core::ChannelStatus;
use ael_integration_tests::{Harness, XorShift};
use ael_ledger::MemoryLedger;
use futures::future::join_all;
use rust_decimal::Decimal;

const AGENTS: [&str; 4] = ["a", "b", "c", "d"];

// =========================================================================
// Conservation
// =========================================================================

#[tokio::test]
async fn test_conservation_over_random_operations() {
    let h = Harness::memory(&AGENTS);
    h.open("ch_rand", &AGENTS, Decimal::from(5)).await;
    let ctx = OpContext::background();
    let mut rng = XorShift::new(0x5eed);

    let mut committed = 0u64;
    for _ in 0..400 {
        let from = AGENTS[rng.below(4) as usize];
        let to = AGENTS[rng.below(4) as usize];
        match rng.below(10) {
            0 => {
                let credits = rng.below(300) + 1;
                h.engine.topup_credits(&ctx, "ch_rand", from, credits).await.unwrap();
            }
            _ => {
                let amount = rng.below(3000);
                match h.send("ch_rand", from, to, amount).await {
                    Ok(_) => committed += 1,
                    Err(ChannelError::InsufficientBalance { .. }) | Err(ChannelError::InvalidRequest(_)) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }
        h.assert_conserved("ch_rand").await;
    }

    let ch = h.channel("ch_rand").await;
    assert_eq!(ch.total_transactions, committed);
    let log = h.engine.list_transactions(&ctx, "ch_rand").await.unwrap();
    assert_eq!(log.len() as u64, committed);

    let close = h.engine.close_channel(&ctx, "ch_rand").await.unwrap();
    assert_eq!(close.settlement.total_credits, ch.total_credits_minted);
    assert_eq!(close.settlement.total_owed(), ch.total_usdc_deposited);
}

#[tokio::test]
async fn test_fractional_deposit_truncates_deterministically() {
    let h = Harness::memory(&["a", "b"]);
    // 1.2345 × 1000 = 1234.5, minted as 1234.
    let ch = h.open("ch_frac", &["a", "b"], Decimal::new(12345, 4)).await;
    assert_eq!(ch.total_credits_minted, 1234);
    assert_eq!(ch.total_usdc_deposited, Decimal::new(12345, 4));

    let close = h
        .engine
        .close_channel(&OpContext::background(), "ch_frac")
        .await
        .unwrap();
    assert_eq!(close.settlement.total_owed(), Decimal::new(1234, 3));
    assert_eq!(close.settlement.unallocated(), Decimal::new(5, 4));
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overdraw_prefix_succeeds() {
    let h = Harness::memory(&["a", "b"]);
    h.open("ch_race", &["a", "b"], Decimal::from(1)).await;

    // 25 × 90 = 2250 against a balance of 1000: exactly 11 fit.
    let engine = h.engine.clone();
    let attempts = (0..25).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .send_transaction(
                    &OpContext::background(),
                    "ch_race",
                    ael_core::TxRequest {
                        from: "a".into(),
                        to: "b".into(),
                        amount: 90,
                        memo: String::new(),
                    },
                )
                .await
        })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(ChannelError::InsufficientBalance { .. })))
        .count();
    assert_eq!(ok, 11);
    assert_eq!(short, 14);

    let balances = h.balances("ch_race").await;
    assert_eq!(balances["a"], 10);
    assert_eq!(balances["b"], 990);
    h.assert_conserved("ch_race").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engines_sharing_a_store_serialize_per_channel() {
    let store = Arc::new(MemoryLedger::new());
    let first = Harness::build(store.clone(), false, &["a", "b"], EngineConfig::default());
    let second = Harness::build(store.clone(), false, &["a", "b"], EngineConfig::default());
    first.open("ch_shared", &["a", "b"], Decimal::from(1)).await;

    // 20 × 300 = 6000 against 1000, split across both engines: exactly 3 fit.
    let attempts = (0..20).map(|i| {
        let engine = if i % 2 == 0 {
            first.engine.clone()
        } else {
            second.engine.clone()
        };
        tokio::spawn(async move {
            engine
                .send_transaction(
                    &OpContext::background(),
                    "ch_shared",
                    ael_core::TxRequest {
                        from: "a".into(),
                        to: "b".into(),
                        amount: 300,
                        memo: String::new(),
                    },
                )
                .await
        })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(ChannelError::InsufficientBalance { .. })))
        .count();
    assert_eq!(ok, 3);
    assert_eq!(short, 17);

    for h in [&first, &second] {
        let balances = h.balances("ch_shared").await;
        assert_eq!(balances["a"], 100);
        assert_eq!(balances["b"], 900);
        assert_eq!(h.channel("ch_shared").await.total_transactions, 3);
        h.assert_conserved("ch_shared").await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_channels_progress_independently() {
    let h = Arc::new(Harness::memory(&AGENTS));
    for i in 0..8 {
        h.open(&format!("ch_par_{i}"), &AGENTS, Decimal::from(10)).await;
    }

    let workers = (0..8).map(|i| {
        let h = h.clone();
        tokio::spawn(async move {
            let id = format!("ch_par_{i}");
            for n in 0..50u64 {
                let to = AGENTS[(n % 3 + 1) as usize];
                h.send(&id, "a", to, 7).await.unwrap();
            }
            id
        })
    });
    for id in join_all(workers).await {
        let id = id.unwrap();
        let ch = h.channel(&id).await;
        assert_eq!(ch.total_transactions, 50);
        assert_eq!(h.balances(&id).await["a"], 10_000 - 350);
        h.assert_conserved(&id).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_racing_transfers_freezes_a_consistent_snapshot() {
    let h = Arc::new(Harness::memory(&["a", "b"]));
    h.open("ch_freeze", &["a", "b"], Decimal::from(10)).await;

    let senders = (0..40).map(|_| {
        let h = h.clone();
        tokio::spawn(async move { h.send("ch_freeze", "a", "b", 10).await })
    });
    let closer = {
        let h = h.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            h.engine.close_channel(&OpContext::background(), "ch_freeze").await
        })
    };

    let sent = join_all(senders).await;
    let receipt = closer.await.unwrap().unwrap();

    let mut applied = 0u64;
    for r in sent {
        match r.unwrap() {
            Ok(_) => applied += 1,
            Err(ChannelError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    // Everything that committed is in the settlement; nothing committed after it.
    let stl = &receipt.settlement;
    assert_eq!(stl.total_transactions, applied);
    assert_eq!(stl.balances["b"], applied * 10);
    assert_eq!(h.balances("ch_freeze").await, stl.balances);
    assert_eq!(h.channel("ch_freeze").await.status, ChannelStatus::Settled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_close_calls_escrow_once() {
    let h = Arc::new(Harness::memory(&["a", "b"]));
    h.open("ch_twice", &["a", "b"], Decimal::from(3)).await;
    h.send("ch_twice", "a", "b", 1000).await.unwrap();

    let closers = (0..6).map(|_| {
        let h = h.clone();
        tokio::spawn(async move {
            h.engine
                .close_channel(&OpContext::background(), "ch_twice")
                .await
        })
    });
    let results: Vec<_> = join_all(closers).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ChannelError::Conflict(_))));

    // Retries after a successful settlement are no-ops too.
    let ctx = OpContext::background();
    assert!(h.engine.retry_settlement(&ctx, "ch_twice").await.is_err());

    let calls = h.escrow().settle_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].balances, vec![2000, 1000]);
}
