use std::sync::{Mutex, MutexGuard, PoisonError};

use ael_core::{Channel, ChannelStatus, EventRecord, Participant, TransactionRecord};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::LedgerError;
use crate::traits::{ChannelSummary, LedgerStore};
use crate::txn::{LedgerTxn, LockTable, StagedWrite};

#[derive(Debug, Clone)]
struct StoredChannel {
    channel: Channel,
    participants: Vec<Participant>,
    transactions: Vec<TransactionRecord>,
}

/// In-process ledger backed by `DashMap`.
///
/// A commit replaces the channel row and participants and extends the log
/// while holding the map shard's write lock, so readers observe either the
/// state before the commit or after it. The event log is one list shared by
/// all channels; commits append to it in the order they apply.
pub struct MemoryLedger {
    channels: DashMap<String, StoredChannel>,
    events: Mutex<Vec<EventRecord>>,
    locks: LockTable,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            events: Mutex::new(Vec::new()),
            locks: LockTable::new(),
        }
    }

    fn events(&self) -> MutexGuard<'_, Vec<EventRecord>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn insert_channel(
        &self,
        channel: Channel,
        participants: Vec<Participant>,
    ) -> Result<(), LedgerError> {
        match self.channels.entry(channel.channel_id.clone()) {
            Entry::Occupied(e) => Err(LedgerError::AlreadyExists(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(StoredChannel {
                    channel,
                    participants,
                    transactions: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn begin(&self, channel_id: &str) -> Result<LedgerTxn, LedgerError> {
        let lease = self.locks.acquire(channel_id).await;
        let (channel, participants) = {
            let stored = self
                .channels
                .get(channel_id)
                .ok_or_else(|| LedgerError::ChannelNotFound(channel_id.to_string()))?;
            (stored.channel.clone(), stored.participants.clone())
        };
        Ok(LedgerTxn::new(lease, channel, participants))
    }

    async fn commit(&self, txn: LedgerTxn) -> Result<(), LedgerError> {
        txn.verify_conservation()?;
        let StagedWrite {
            lease: _lease,
            channel,
            participants,
            transactions,
            events,
        } = txn.into_parts();

        let mut log = self.events();
        let mut stored = self
            .channels
            .get_mut(&channel.channel_id)
            .ok_or_else(|| LedgerError::ChannelNotFound(channel.channel_id.clone()))?;
        stored.channel = channel;
        stored.participants = participants;
        stored.transactions.extend(transactions);
        for mut event in events {
            event.seq = log.len() as u64 + 1;
            log.push(event);
        }
        Ok(())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, LedgerError> {
        Ok(self.channels.get(channel_id).map(|s| s.channel.clone()))
    }

    async fn get_participants(&self, channel_id: &str) -> Result<Vec<Participant>, LedgerError> {
        self.channels
            .get(channel_id)
            .map(|s| s.participants.clone())
            .ok_or_else(|| LedgerError::ChannelNotFound(channel_id.to_string()))
    }

    async fn list_transactions(
        &self,
        channel_id: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.channels
            .get(channel_id)
            .map(|s| s.transactions.clone())
            .ok_or_else(|| LedgerError::ChannelNotFound(channel_id.to_string()))
    }

    async fn list_events(
        &self,
        channel_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, LedgerError> {
        Ok(self
            .events()
            .iter()
            .rev()
            .filter(|e| channel_id.is_none_or(|id| e.channel_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_channels(&self, limit: usize) -> Result<Vec<ChannelSummary>, LedgerError> {
        let mut all: Vec<ChannelSummary> = self
            .channels
            .iter()
            .map(|entry| ChannelSummary {
                channel: entry.channel.clone(),
                participant_count: entry.participants.len(),
            })
            .collect();
        all.sort_by(|a, b| b.channel.created_at.cmp(&a.channel.created_at));
        all.truncate(limit);
        Ok(all)
    }

    async fn channels_with_status(
        &self,
        status: ChannelStatus,
    ) -> Result<Vec<Channel>, LedgerError> {
        Ok(self
            .channels
            .iter()
            .filter(|entry| entry.channel.status == status)
            .map(|entry| entry.channel.clone())
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
