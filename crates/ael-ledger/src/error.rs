/// Ledger store errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("channel already exists: {0}")]
    AlreadyExists(String),

    #[error("conservation violated on {channel_id}: minted {minted}, balances sum to {balances}")]
    ConservationViolation {
        channel_id: String,
        minted: u64,
        balances: u64,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("unreadable key in event log: {0}")]
    CorruptKey(String),

    #[error("column family '{0}' not found")]
    MissingColumnFamily(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
