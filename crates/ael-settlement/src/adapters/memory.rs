use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{ResolveError, SettlementError};
use crate::traits::{EscrowClient, IdentityResolver};
use crate::types::normalize_address;

/// One recorded `settle` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleCall {
    pub channel_id: String,
    pub addresses: Vec<String>,
    pub balances: Vec<u64>,
}

#[derive(Debug, Default)]
struct Recorded {
    attempts: Vec<SettleCall>,
    settles: Vec<SettleCall>,
    deposits: Vec<(String, u64)>,
    topups: Vec<(String, u64)>,
    fail_next: Option<String>,
    delay: Option<Duration>,
}

/// In-process escrow that records every call and hands out sequential
/// transaction references. Can be told to fail or stall the next call.
///
/// A `settle` call counts as an attempt the moment it arrives, before any
/// delay or injected failure; it counts as completed only once it returns.
pub struct MemoryEscrow {
    state: Mutex<Recorded>,
    seq: AtomicU64,
}

impl MemoryEscrow {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Recorded::default()),
            seq: AtomicU64::new(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call fail with an escrow error.
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.state().fail_next = Some(reason.into());
    }

    /// Delay every subsequent call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }

    /// Settle calls that returned a transaction reference.
    pub fn settle_calls(&self) -> Vec<SettleCall> {
        self.state().settles.clone()
    }

    /// Every settle call that reached the escrow, including ones that later
    /// failed or whose caller stopped waiting.
    pub fn settle_attempts(&self) -> Vec<SettleCall> {
        self.state().attempts.clone()
    }

    pub fn deposits(&self) -> Vec<(String, u64)> {
        self.state().deposits.clone()
    }

    pub fn topups(&self) -> Vec<(String, u64)> {
        self.state().topups.clone()
    }

    async fn enter(&self) -> Result<String, SettlementError> {
        let delay = self.state().delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Some(reason) = self.state().fail_next.take() {
            return Err(SettlementError::Escrow(reason));
        }
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        Ok(format!("0x{n:064x}"))
    }
}

impl Default for MemoryEscrow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EscrowClient for MemoryEscrow {
    async fn settle(
        &self,
        channel_id: &str,
        addresses: &[String],
        balances: &[u64],
    ) -> Result<String, SettlementError> {
        let call = SettleCall {
            channel_id: channel_id.to_string(),
            addresses: addresses.to_vec(),
            balances: balances.to_vec(),
        };
        self.state().attempts.push(call.clone());
        let tx = self.enter().await?;
        self.state().settles.push(call);
        Ok(tx)
    }

    async fn deposit(&self, channel_id: &str, usdc_base_units: u64) -> Result<String, SettlementError> {
        let tx = self.enter().await?;
        self.state().deposits.push((channel_id.to_string(), usdc_base_units));
        Ok(tx)
    }

    async fn topup(&self, channel_id: &str, usdc_base_units: u64) -> Result<String, SettlementError> {
        let tx = self.enter().await?;
        self.state().topups.push((channel_id.to_string(), usdc_base_units));
        Ok(tx)
    }

    fn client_id(&self) -> &str {
        "escrow-memory"
    }
}

/// Resolver backed by a fixed agent → address table.
pub struct StaticResolver {
    addresses: DashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self {
            addresses: DashMap::new(),
        }
    }

    /// Build from a config table, rejecting malformed addresses up front.
    pub fn from_table(table: &BTreeMap<String, String>) -> Result<Self, ResolveError> {
        let resolver = Self::new();
        for (agent, address) in table {
            resolver.register(agent, address)?;
        }
        Ok(resolver)
    }

    pub fn register(&self, agent_id: &str, address: &str) -> Result<(), ResolveError> {
        let normalized = normalize_address(address).ok_or_else(|| ResolveError::InvalidAddress {
            agent_id: agent_id.to_string(),
            address: address.to_string(),
        })?;
        self.addresses.insert(agent_id.to_string(), normalized);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for StaticResolver {
    async fn resolve(&self, agent_id: &str) -> Result<String, ResolveError> {
        self.addresses
            .get(agent_id)
            .map(|a| a.clone())
            .ok_or_else(|| ResolveError::NotFound(agent_id.to_string()))
    }
}
