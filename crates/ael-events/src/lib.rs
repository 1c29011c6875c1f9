//! AEL Events
//!
//! Lifecycle and transaction events emitted by the channel engine after a
//! mutation commits, and the hub that fans them out to per-channel and global
//! subscribers.

pub mod event;
pub mod hub;

pub use event::{ChannelEvent, EventEnvelope};
pub use hub::{EventHub, EventPublisher};
