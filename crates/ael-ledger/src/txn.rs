use std::sync::Arc;

use ael_core::{Channel, EventRecord, Participant, TransactionRecord};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::LedgerError;

/// Exclusive right to mutate one channel. Released on drop.
pub struct ChannelLease {
    channel_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl ChannelLease {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

/// One async mutex per channel id, created on first use.
///
/// Waiters are granted the lease in FIFO order.
#[derive(Default)]
pub struct LockTable {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, channel_id: &str) -> ChannelLease {
        let lock = {
            let entry = self.locks.entry(channel_id.to_string()).or_default();
            Arc::clone(entry.value())
        };
        let guard = lock.lock_owned().await;
        ChannelLease {
            channel_id: channel_id.to_string(),
            _guard: guard,
        }
    }

    /// Number of channel ids that have ever been leased.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// A staged unit of work on one channel.
///
/// Holds the channel's lease for its whole lifetime. Nothing is visible to
/// readers until the owning store commits it; dropping it is a rollback.
pub struct LedgerTxn {
    lease: ChannelLease,
    channel: Channel,
    participants: Vec<Participant>,
    appended: Vec<TransactionRecord>,
    events: Vec<EventRecord>,
    tx_seq_start: u64,
}

/// A committed-to-be write, split out of a [`LedgerTxn`] by the backend.
pub struct StagedWrite {
    /// Must stay bound until the write finishes.
    pub lease: ChannelLease,
    pub channel: Channel,
    pub participants: Vec<Participant>,
    pub transactions: Vec<TransactionRecord>,
    pub events: Vec<EventRecord>,
}

impl LedgerTxn {
    pub fn new(lease: ChannelLease, channel: Channel, participants: Vec<Participant>) -> Self {
        let tx_seq_start = channel.total_transactions;
        Self {
            lease,
            channel,
            participants,
            appended: Vec::new(),
            events: Vec::new(),
            tx_seq_start,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn balance_of(&self, agent_id: &str) -> Option<u64> {
        self.participants
            .iter()
            .find(|p| p.agent_id == agent_id)
            .map(|p| p.balance)
    }

    pub fn participant_mut(&mut self, agent_id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.agent_id == agent_id)
    }

    pub fn append_transaction(&mut self, record: TransactionRecord) {
        self.appended.push(record);
    }

    pub fn appended(&self) -> &[TransactionRecord] {
        &self.appended
    }

    /// Stage an event-log row; it is written by the same commit.
    pub fn record_event(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    pub fn staged_events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Sequence number of the first transaction appended by this unit.
    pub fn tx_seq_start(&self) -> u64 {
        self.tx_seq_start
    }

    /// Check `sum(balances) == total_credits_minted` on the staged state.
    pub fn verify_conservation(&self) -> Result<(), LedgerError> {
        let sum = self
            .participants
            .iter()
            .try_fold(0u64, |acc, p| acc.checked_add(p.balance));
        match sum {
            Some(sum) if sum == self.channel.total_credits_minted => Ok(()),
            other => Err(LedgerError::ConservationViolation {
                channel_id: self.channel.channel_id.clone(),
                minted: self.channel.total_credits_minted,
                balances: other.unwrap_or(u64::MAX),
            }),
        }
    }

    /// Split into parts for a backend's commit.
    pub fn into_parts(self) -> StagedWrite {
        StagedWrite {
            lease: self.lease,
            channel: self.channel,
            participants: self.participants,
            transactions: self.appended,
            events: self.events,
        }
    }
}
