use std::fmt;

use crate::error::CoreError;

/// The four statuses of a channel lifecycle.
///
/// Statuses only ever move forward: `pending → active → closing → settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Channel row and initial mint are written; not yet open.
    Pending,
    /// Channel accepts transfers and top-ups.
    Active,
    /// Balances are frozen; settlement is in progress or awaiting retry.
    Closing,
    /// Settlement finished (submitted, degraded, or manually resolved). Final.
    Settled,
}

impl ChannelStatus {
    /// Whether this is the terminal status.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Only active channels accept balance mutations.
    pub fn accepts_mutations(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Position in the lifecycle, used to check monotonicity.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Closing => 2,
            Self::Settled => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Settled => "settled",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that drive the channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The initial mint committed.
    Opened,
    /// A close was requested; balances freeze.
    CloseRequested,
    /// Settlement reached a final outcome.
    SettlementFinalized,
}

impl LifecycleEvent {
    fn target(&self) -> ChannelStatus {
        match self {
            Self::Opened => ChannelStatus::Active,
            Self::CloseRequested => ChannelStatus::Closing,
            Self::SettlementFinalized => ChannelStatus::Settled,
        }
    }
}

/// Applies lifecycle events to channel statuses.
///
/// Valid transitions:
/// - Pending → Active (Opened)
/// - Active → Closing (CloseRequested)
/// - Closing → Settled (SettlementFinalized)
///
/// There are no backward edges and no skips.
pub struct ChannelStateMachine;

impl ChannelStateMachine {
    /// Attempt a transition. Returns the new status or an error for any
    /// transition not listed above.
    pub fn transition(
        current: ChannelStatus,
        event: LifecycleEvent,
    ) -> Result<ChannelStatus, CoreError> {
        let next = match (current, event) {
            (ChannelStatus::Pending, LifecycleEvent::Opened) => ChannelStatus::Active,
            (ChannelStatus::Active, LifecycleEvent::CloseRequested) => ChannelStatus::Closing,
            (ChannelStatus::Closing, LifecycleEvent::SettlementFinalized) => ChannelStatus::Settled,
            _ => {
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: event.target(),
                })
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "channel status transition");

        Ok(next)
    }

    pub fn can_transition(current: ChannelStatus, event: LifecycleEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
