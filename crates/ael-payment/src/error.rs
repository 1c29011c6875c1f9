use crate::types::PaymentTerms;

/// Payment-gate errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    /// No proof was supplied.
    #[error("payment required")]
    PaymentRequired(PaymentTerms),

    /// The facilitator judged the proof invalid, or it pays someone else.
    #[error("payment rejected: {reason}")]
    Rejected { reason: String, terms: PaymentTerms },

    /// The facilitator could not give an answer; the caller may retry.
    #[error("payment verification unavailable: {0}")]
    Transient(String),

    #[error("payment gate misconfigured: {0}")]
    Config(String),
}

impl PaymentError {
    /// Terms to report back to the caller, where the error carries them.
    pub fn terms(&self) -> Option<&PaymentTerms> {
        match self {
            Self::PaymentRequired(terms) | Self::Rejected { terms, .. } => Some(terms),
            _ => None,
        }
    }
}
