use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ChannelError;

/// Per-call context carrying an optional deadline.
///
/// Work run through [`OpContext::run`] is dropped when the deadline passes.
/// Store transactions dropped before commit roll back.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
}

impl OpContext {
    /// No deadline.
    pub fn background() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| d <= Instant::now())
    }

    /// Run `fut` bounded by the deadline.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ChannelError>
    where
        F: Future<Output = Result<T, ChannelError>>,
    {
        let Some(deadline) = self.deadline else {
            return fut.await;
        };
        // an expired deadline fails before the work is polled at all
        if deadline <= Instant::now() {
            return Err(ChannelError::DeadlineExceeded);
        }
        tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| ChannelError::DeadlineExceeded)?
    }
}
