use ael_core::CoreError;
use ael_ledger::LedgerError;

/// Channel engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient balance for {agent_id}: available {available}, required {required}")]
    InsufficientBalance {
        agent_id: String,
        available: u64,
        required: u64,
    },

    #[error("external dependency failed: {0}")]
    TransientExternalFailure(String),

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChannelError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientExternalFailure(_) | Self::DeadlineExceeded)
    }
}

impl From<LedgerError> for ChannelError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ChannelNotFound(id) => Self::NotFound(format!("channel {id}")),
            LedgerError::AlreadyExists(id) => Self::Conflict(format!("channel {id} already exists")),
            other => Self::Ledger(other),
        }
    }
}

impl From<CoreError> for ChannelError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidStateTransition { from, .. } => {
                Self::Conflict(format!("channel is {from}"))
            }
            CoreError::InvalidAmount(msg) | CoreError::ValidationError(msg) => {
                Self::InvalidRequest(msg)
            }
            CoreError::InvalidRatio(r) => Self::Internal(format!("invalid exchange ratio {r}")),
        }
    }
}
