//! AEL Channel Engine
//!
//! Applies channel operations to the ledger store under the single-writer
//! per-channel discipline, drives the lifecycle
//! `pending → active → closing → settled`, publishes events after commit, and
//! hands frozen balances to the settlement orchestrator outside the lock.

pub mod context;
pub mod engine;
pub mod error;
pub mod ledger_engine;
pub mod reconciler;

pub use context::OpContext;
pub use engine::{ChannelEngine, CloseReceipt, SettlementOutcome, TopupReceipt};
pub use error::ChannelError;
pub use ledger_engine::{EngineConfig, LedgerEngine};
pub use reconciler::{ReconcileReport, SettlementReconciler};
