//! AEL Core
//!
//! Shared data model for the channel ledger: channels, participants,
//! transactions, settlements, the channel lifecycle state machine, and the
//! fixed exchange ratio between deposited currency and credits.

pub mod error;
pub mod types;
pub mod state_machine;
pub mod config;

pub use config::{ExchangeRatio, LedgerConfig, DEFAULT_CREDIT_RATIO, DEFAULT_MAX_PARTICIPANTS};
pub use error::CoreError;
pub use state_machine::{ChannelStateMachine, ChannelStatus, LifecycleEvent};
pub use types::{
    Channel, ChannelMode, CreateChannelRequest, CreditBalance, EventRecord, Participant,
    Settlement, SettlementState, TransactionRecord, TxRequest, TxResult, TxStatus,
    DEFAULT_CHANNEL_TYPE,
};
