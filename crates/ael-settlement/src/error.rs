/// Settlement-layer errors.
///
/// Errors raised before the escrow call is sent are always safe to retry.
/// Errors from the call itself are retryable only when the escrow is known
/// not to have acted on it; see [`SettlementError::is_ambiguous`].
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("no participant of channel {0} resolved to a chain address")]
    NoEligibleRecipients(String),

    #[error("identity resolver unavailable: {0}")]
    ResolverUnavailable(String),

    #[error("escrow call failed: {0}")]
    Escrow(String),

    #[error("escrow transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SettlementError {
    /// Whether the escrow may have executed the call despite the error.
    ///
    /// An explicit rejection or a connection that was never established
    /// means nothing happened. A request that was sent but whose response
    /// was lost, timed out or could not be read may have paid out.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            Self::Transport(e) => !(e.is_connect() || e.is_builder()),
            Self::NoEligibleRecipients(_) | Self::ResolverUnavailable(_) | Self::Escrow(_) => false,
        }
    }
}

/// Failure to map an agent id to a chain address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The agent has no registered address.
    #[error("no address registered for agent {0}")]
    NotFound(String),

    /// A registered address that is not a 20-byte hex address.
    #[error("agent {agent_id} has malformed address {address}")]
    InvalidAddress { agent_id: String, address: String },

    /// The resolver itself could not answer.
    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}
