//! Shared node state for the HTTP handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ael_channel::{ChannelEngine, OpContext};
use ael_payment::PaymentGate;
use ael_settlement::EscrowClient;

use crate::config::StorageBackend;

/// Shared state for the running node, accessible from HTTP handlers.
pub struct AppState {
    pub engine: Arc<dyn ChannelEngine>,
    pub gate: Arc<PaymentGate>,
    /// Escrow used to mirror paid deposits and top-ups. `None` in degraded mode.
    pub escrow: Option<Arc<dyn EscrowClient>>,
    pub backend: StorageBackend,
    /// When the node started.
    pub start_time: Instant,
    /// Deadline given to each request's engine work.
    pub op_timeout: Duration,
}

impl AppState {
    /// A fresh deadline for one request.
    pub fn op_context(&self) -> OpContext {
        OpContext::with_timeout(self.op_timeout)
    }
}
