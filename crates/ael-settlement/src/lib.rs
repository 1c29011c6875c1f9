//! AEL Settlement Layer
//!
//! Turns a closed channel's frozen balances into one batched escrow call.
//! Participant identities are resolved to chain addresses through a pluggable
//! [`IdentityResolver`]; the escrow itself sits behind [`EscrowClient`].
//! When no escrow is configured the [`Settler`] reports an explicit degraded
//! outcome instead of an error.

pub mod adapters;
pub mod error;
pub mod settler;
pub mod traits;
pub mod types;

pub use adapters::{HttpEscrowClient, HttpResolver, MemoryEscrow, SettleCall, StaticResolver};
pub use error::{ResolveError, SettlementError};
pub use settler::Settler;
pub use traits::{EscrowClient, IdentityResolver};
pub use types::{
    channel_id_bytes32, normalize_address, usdc_base_units, Recipient, SettleReceipt, SettlementPlan,
    USDC_BASE_UNITS,
};
