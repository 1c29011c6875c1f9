//! AEL Payment Gate
//!
//! Verifies a caller-supplied payment proof against an external facilitator
//! before a paid channel operation (create, top-up) reaches the engine.
//! Skipping verification is an explicit [`VerificationMode::Disabled`]
//! setting; a facilitator outage is always surfaced as
//! [`PaymentError::Transient`], never treated as "skip".

pub mod error;
pub mod facilitator;
pub mod gate;
pub mod types;

pub use error::PaymentError;
pub use facilitator::{Facilitator, HttpFacilitator};
pub use gate::PaymentGate;
pub use types::{
    GateConfig, GateDecision, PaymentTerms, VerificationMode, VerifiedPayment, VerifyRequest,
    VerifyResponse, PAYMENT_HEADER,
};
