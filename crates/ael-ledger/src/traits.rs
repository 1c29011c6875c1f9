use ael_core::{Channel, ChannelStatus, EventRecord, Participant, TransactionRecord};
use async_trait::async_trait;
use serde::Serialize;

use crate::error::LedgerError;
use crate::txn::LedgerTxn;

/// A channel row together with its participant count, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    #[serde(flatten)]
    pub channel: Channel,
    pub participant_count: usize,
}

/// Ledger store interface.
///
/// `begin` is the store's serialization primitive: it grants an exclusive
/// lease on one channel and stages a copy of its row and participants.
/// Leases on different channels never contend.
///
/// Both bundled backends keep their leases in process memory. They
/// serialize every engine that shares one store handle inside one process,
/// and neither supports a second process opening the same data: RocksDB
/// refuses a second open of a live database directory. A backend shared by
/// several service instances must implement `begin` with a lock that lives
/// in the store itself (a row lock taken with `SELECT ... FOR UPDATE`, for
/// example).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new channel and its participants.
    ///
    /// Fails with [`LedgerError::AlreadyExists`] if the external id is taken.
    async fn insert_channel(
        &self,
        channel: Channel,
        participants: Vec<Participant>,
    ) -> Result<(), LedgerError>;

    /// Acquire the channel's lease and stage its current state.
    async fn begin(&self, channel_id: &str) -> Result<LedgerTxn, LedgerError>;

    /// Atomically write a staged transaction, then release its lease.
    ///
    /// Rejects the whole write if the staged balances do not sum to the
    /// staged minted total.
    async fn commit(&self, txn: LedgerTxn) -> Result<(), LedgerError>;

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, LedgerError>;

    /// Participant rows in join order.
    async fn get_participants(&self, channel_id: &str) -> Result<Vec<Participant>, LedgerError>;

    /// The transaction log in commit order.
    async fn list_transactions(
        &self,
        channel_id: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// The durable event log, newest first. `channel_id` narrows it to one
    /// channel; unknown channels yield an empty list.
    async fn list_events(
        &self,
        channel_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, LedgerError>;

    /// Most recently created channels first.
    async fn list_channels(&self, limit: usize) -> Result<Vec<ChannelSummary>, LedgerError>;

    async fn channels_with_status(
        &self,
        status: ChannelStatus,
    ) -> Result<Vec<Channel>, LedgerError>;

    /// Backend name, e.g. "memory" or "rocksdb".
    fn backend(&self) -> &'static str;
}
