//! AEL Ledger Store
//!
//! The single source of truth for channels, participant balances, the
//! transaction log and the event log. Every balance mutation runs inside a
//! [`LedgerTxn`]: a per-channel lease plus a staged copy of the channel row
//! and its participants. Committing writes the staged state and any staged
//! events atomically; dropping the transaction discards them.

pub mod error;
pub mod traits;
pub mod txn;
pub mod memory;
pub mod rocks;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use rocks::RocksLedger;
pub use traits::{ChannelSummary, LedgerStore};
pub use txn::{ChannelLease, LedgerTxn, LockTable, StagedWrite};
