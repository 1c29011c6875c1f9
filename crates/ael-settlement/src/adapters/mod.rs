//! Concrete escrow clients and identity resolvers.

pub mod http;
pub mod memory;

pub use http::{HttpEscrowClient, HttpResolver};
pub use memory::{MemoryEscrow, SettleCall, StaticResolver};
