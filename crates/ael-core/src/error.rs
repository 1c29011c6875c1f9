use crate::state_machine::ChannelStatus;

/// Core ledger-model errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid channel status transition from {from} to {to}")]
    InvalidStateTransition {
        from: ChannelStatus,
        to: ChannelStatus,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid exchange ratio {0}: must be a power of ten")]
    InvalidRatio(u64),

    #[error("validation failed: {0}")]
    ValidationError(String),
}
