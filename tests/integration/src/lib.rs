//! Shared fixtures for the cross-crate scenarios in `tests/`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ael_channel::{ChannelEngine, EngineConfig, LedgerEngine, OpContext};
use ael_core::{Channel, ChannelMode, CreateChannelRequest, TxRequest, DEFAULT_CHANNEL_TYPE};
use ael_events::EventHub;
use ael_ledger::{LedgerStore, MemoryLedger, RocksLedger};
use ael_settlement::{EscrowClient, MemoryEscrow, Settler, StaticResolver};
use rust_decimal::Decimal;

/// Deterministic 0x address for a test agent.
pub fn address_of(agent_id: &str) -> String {
    let tag: u64 = agent_id.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    format!("0x{:040x}", tag)
}

/// Resolver that knows every agent in `agents`.
pub fn resolver_for(agents: &[&str]) -> StaticResolver {
    let table: BTreeMap<String, String> = agents
        .iter()
        .map(|a| (a.to_string(), address_of(a)))
        .collect();
    match StaticResolver::from_table(&table) {
        Ok(r) => r,
        Err(e) => panic!("test addresses must be valid: {e}"),
    }
}

/// An engine wired to in-process collaborators.
pub struct Harness {
    pub engine: Arc<LedgerEngine>,
    /// `None` when the harness runs without escrow (degraded settlement).
    pub escrow: Option<Arc<MemoryEscrow>>,
    pub hub: Arc<EventHub>,
}

impl Harness {
    /// Memory ledger, memory escrow, resolver knowing `agents`.
    pub fn memory(agents: &[&str]) -> Self {
        Self::build(Arc::new(MemoryLedger::new()), true, agents, EngineConfig::default())
    }

    /// Memory ledger and no escrow.
    pub fn degraded(agents: &[&str]) -> Self {
        Self::build(Arc::new(MemoryLedger::new()), false, agents, EngineConfig::default())
    }

    pub fn build(
        store: Arc<dyn LedgerStore>,
        with_escrow: bool,
        agents: &[&str],
        config: EngineConfig,
    ) -> Self {
        let escrow = with_escrow.then(|| Arc::new(MemoryEscrow::new()));
        let client = escrow.clone().map(|e| e as Arc<dyn EscrowClient>);
        let settler = Settler::new(client, Arc::new(resolver_for(agents)));
        let hub = Arc::new(EventHub::default());
        let engine = Arc::new(LedgerEngine::new(store, Arc::new(settler), hub.clone(), config));
        Self { engine, escrow, hub }
    }

    pub fn escrow(&self) -> &MemoryEscrow {
        match &self.escrow {
            Some(e) => e,
            None => panic!("harness was built without escrow"),
        }
    }

    /// Create a lite channel with a fixed id.
    pub async fn open(&self, channel_id: &str, participants: &[&str], usdc: Decimal) -> Channel {
        let req = CreateChannelRequest {
            mode: ChannelMode::Lite,
            channel_id: Some(channel_id.to_string()),
            channel_type: DEFAULT_CHANNEL_TYPE.to_string(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
            usdc_amount: usdc,
            max_participants: 0,
        };
        match self.engine.create_channel(&OpContext::background(), req).await {
            Ok(ch) => ch,
            Err(e) => panic!("create {channel_id}: {e}"),
        }
    }

    pub async fn send(
        &self,
        channel_id: &str,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<ael_core::TxResult, ael_channel::ChannelError> {
        self.engine
            .send_transaction(
                &OpContext::background(),
                channel_id,
                TxRequest {
                    from: from.to_string(),
                    to: to.to_string(),
                    amount,
                    memo: String::new(),
                },
            )
            .await
    }

    /// Balances by agent.
    pub async fn balances(&self, channel_id: &str) -> BTreeMap<String, u64> {
        match self.engine.get_balances(&OpContext::background(), channel_id).await {
            Ok(rows) => rows.into_iter().map(|p| (p.agent_id, p.balance)).collect(),
            Err(e) => panic!("balances {channel_id}: {e}"),
        }
    }

    pub async fn channel(&self, channel_id: &str) -> Channel {
        match self.engine.get_channel(&OpContext::background(), channel_id).await {
            Ok(ch) => ch,
            Err(e) => panic!("get {channel_id}: {e}"),
        }
    }

    /// Assert the conservation law for one channel.
    pub async fn assert_conserved(&self, channel_id: &str) {
        let ch = self.channel(channel_id).await;
        let sum: u64 = self.balances(channel_id).await.values().sum();
        assert_eq!(
            sum, ch.total_credits_minted,
            "balances of {channel_id} do not sum to the minted total"
        );
    }
}

/// Engine config with short settlement windows.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        settlement_timeout: Duration::from_millis(200),
        stale_claim_after: Duration::from_millis(300),
        ..EngineConfig::default()
    }
}

/// A scratch directory removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        Self(std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::now_v7())))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn open_ledger(&self) -> Arc<RocksLedger> {
        match RocksLedger::open(&self.0) {
            Ok(l) => Arc::new(l),
            Err(e) => panic!("open rocksdb ledger at {}: {e}", self.0.display()),
        }
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Small deterministic generator for randomized operation sequences.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `0..n`.
    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}
