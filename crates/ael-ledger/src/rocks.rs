//! RocksDB ledger backend.
//!
//! Column families mirror the logical schema: `channels` keyed by external
//! channel id, `participants` keyed by `<channel_id>\0<position>`, and
//! `transactions` keyed by `<channel_id>\0<sequence>`, and `events` keyed by
//! a store-wide sequence. Positions and sequences are zero-padded so key
//! order is join order and commit order.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use ael_core::{Channel, ChannelStatus, EventRecord, Participant, TransactionRecord};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use serde::de::DeserializeOwned;

use crate::error::LedgerError;
use crate::traits::{ChannelSummary, LedgerStore};
use crate::txn::{LedgerTxn, LockTable, StagedWrite};

const CF_CHANNELS: &str = "channels";
const CF_PARTICIPANTS: &str = "participants";
const CF_TRANSACTIONS: &str = "transactions";
const CF_EVENTS: &str = "events";

/// RocksDB-backed ledger. Each commit is a single `WriteBatch`.
pub struct RocksLedger {
    db: DB,
    locks: LockTable,
    /// Last event sequence written. Held across the batch write so event
    /// order is commit order.
    event_seq: Mutex<u64>,
}

fn row_prefix(channel_id: &str) -> Vec<u8> {
    let mut key = channel_id.as_bytes().to_vec();
    key.push(0);
    key
}

fn participant_key(channel_id: &str, position: usize) -> Vec<u8> {
    let mut key = row_prefix(channel_id);
    key.extend_from_slice(format!("{position:010}").as_bytes());
    key
}

fn transaction_key(channel_id: &str, seq: u64) -> Vec<u8> {
    let mut key = row_prefix(channel_id);
    key.extend_from_slice(format!("{seq:020}").as_bytes());
    key
}

fn event_key(seq: u64) -> Vec<u8> {
    format!("{seq:020}").into_bytes()
}

impl RocksLedger {
    /// Open or create the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_CHANNELS, Options::default()),
            ColumnFamilyDescriptor::new(CF_PARTICIPANTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        let last_event = Self::last_event_seq(&db)?;
        tracing::info!(path = %path.display(), last_event, "rocksdb ledger opened");

        Ok(Self {
            db,
            locks: LockTable::new(),
            event_seq: Mutex::new(last_event),
        })
    }

    fn last_event_seq(db: &DB) -> Result<u64, LedgerError> {
        let cf = db
            .cf_handle(CF_EVENTS)
            .ok_or(LedgerError::MissingColumnFamily(CF_EVENTS))?;
        let Some(item) = db.iterator_cf(cf, IteratorMode::End).next() else {
            return Ok(0);
        };
        let (key, _) = item?;
        std::str::from_utf8(&key)
            .ok()
            .and_then(|k| k.parse().ok())
            .ok_or_else(|| LedgerError::CorruptKey(String::from_utf8_lossy(&key).into_owned()))
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily, LedgerError> {
        self.db
            .cf_handle(name)
            .ok_or(LedgerError::MissingColumnFamily(name))
    }

    fn read_channel(&self, channel_id: &str) -> Result<Option<Channel>, LedgerError> {
        let cf = self.cf(CF_CHANNELS)?;
        match self.db.get_cf(cf, channel_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_prefix<T: DeserializeOwned>(
        &self,
        cf_name: &'static str,
        prefix: &[u8],
    ) -> Result<Vec<T>, LedgerError> {
        let cf = self.cf(cf_name)?;
        let mut out = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    fn scan_channels(&self) -> Result<Vec<Channel>, LedgerError> {
        let cf = self.cf(CF_CHANNELS)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    fn put_rows(
        &self,
        batch: &mut WriteBatch,
        channel: &Channel,
        participants: &[Participant],
    ) -> Result<(), LedgerError> {
        batch.put_cf(
            self.cf(CF_CHANNELS)?,
            channel.channel_id.as_bytes(),
            serde_json::to_vec(channel)?,
        );
        let cf_participants = self.cf(CF_PARTICIPANTS)?;
        for (position, p) in participants.iter().enumerate() {
            batch.put_cf(
                cf_participants,
                participant_key(&channel.channel_id, position),
                serde_json::to_vec(p)?,
            );
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RocksLedger {
    async fn insert_channel(
        &self,
        channel: Channel,
        participants: Vec<Participant>,
    ) -> Result<(), LedgerError> {
        let _lease = self.locks.acquire(&channel.channel_id).await;
        if self.read_channel(&channel.channel_id)?.is_some() {
            return Err(LedgerError::AlreadyExists(channel.channel_id));
        }
        let mut batch = WriteBatch::default();
        self.put_rows(&mut batch, &channel, &participants)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn begin(&self, channel_id: &str) -> Result<LedgerTxn, LedgerError> {
        let lease = self.locks.acquire(channel_id).await;
        let channel = self
            .read_channel(channel_id)?
            .ok_or_else(|| LedgerError::ChannelNotFound(channel_id.to_string()))?;
        let participants = self.scan_prefix(CF_PARTICIPANTS, &row_prefix(channel_id))?;
        Ok(LedgerTxn::new(lease, channel, participants))
    }

    async fn commit(&self, txn: LedgerTxn) -> Result<(), LedgerError> {
        txn.verify_conservation()?;
        let seq_start = txn.tx_seq_start();
        let StagedWrite {
            lease: _lease,
            channel,
            participants,
            transactions,
            events,
        } = txn.into_parts();

        let mut batch = WriteBatch::default();
        self.put_rows(&mut batch, &channel, &participants)?;
        let cf_tx = self.cf(CF_TRANSACTIONS)?;
        for (offset, record) in transactions.iter().enumerate() {
            batch.put_cf(
                cf_tx,
                transaction_key(&channel.channel_id, seq_start + offset as u64),
                serde_json::to_vec(record)?,
            );
        }

        let cf_events = self.cf(CF_EVENTS)?;
        let mut event_seq = self.event_seq.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = *event_seq;
        for mut event in events {
            next += 1;
            event.seq = next;
            batch.put_cf(cf_events, event_key(next), serde_json::to_vec(&event)?);
        }
        self.db.write(batch)?;
        *event_seq = next;
        Ok(())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, LedgerError> {
        self.read_channel(channel_id)
    }

    async fn get_participants(&self, channel_id: &str) -> Result<Vec<Participant>, LedgerError> {
        if self.read_channel(channel_id)?.is_none() {
            return Err(LedgerError::ChannelNotFound(channel_id.to_string()));
        }
        self.scan_prefix(CF_PARTICIPANTS, &row_prefix(channel_id))
    }

    async fn list_transactions(
        &self,
        channel_id: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        if self.read_channel(channel_id)?.is_none() {
            return Err(LedgerError::ChannelNotFound(channel_id.to_string()));
        }
        self.scan_prefix(CF_TRANSACTIONS, &row_prefix(channel_id))
    }

    async fn list_events(
        &self,
        channel_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, LedgerError> {
        let cf = self.cf(CF_EVENTS)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            if out.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let event: EventRecord = serde_json::from_slice(&value)?;
            if channel_id.is_none_or(|id| event.channel_id == id) {
                out.push(event);
            }
        }
        Ok(out)
    }

    async fn list_channels(&self, limit: usize) -> Result<Vec<ChannelSummary>, LedgerError> {
        let mut channels = self.scan_channels()?;
        channels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        channels.truncate(limit);

        let mut out = Vec::with_capacity(channels.len());
        for channel in channels {
            let participant_count = self
                .scan_prefix::<Participant>(CF_PARTICIPANTS, &row_prefix(&channel.channel_id))?
                .len();
            out.push(ChannelSummary {
                channel,
                participant_count,
            });
        }
        Ok(out)
    }

    async fn channels_with_status(
        &self,
        status: ChannelStatus,
    ) -> Result<Vec<Channel>, LedgerError> {
        Ok(self
            .scan_channels()?
            .into_iter()
            .filter(|c| c.status == status)
            .collect())
    }

    fn backend(&self) -> &'static str {
        "rocksdb"
    }
}
