use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::event::EventEnvelope;

/// Sink for channel events.
///
/// Publishing must never block the caller or report subscriber failures
/// back to it.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, envelope: EventEnvelope);
}

/// Fan-out hub: per-channel subscribers plus global subscribers.
///
/// Built on `tokio::sync::broadcast`, so a slow subscriber lags and loses
/// the oldest events instead of stalling the publisher.
pub struct EventHub {
    global: broadcast::Sender<EventEnvelope>,
    channels: DashMap<String, broadcast::Sender<EventEnvelope>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub whose subscriber queues hold `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        let (global, _) = broadcast::channel(capacity);
        Self {
            global,
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to events for one channel.
    pub fn subscribe(&self, channel_id: &str) -> broadcast::Receiver<EventEnvelope> {
        self.channels
            .entry(channel_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to every event on every channel.
    pub fn subscribe_global(&self) -> broadcast::Receiver<EventEnvelope> {
        self.global.subscribe()
    }

    /// Live subscribers for a channel (excluding global ones).
    pub fn subscriber_count(&self, channel_id: &str) -> usize {
        self.channels
            .get(channel_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventPublisher for EventHub {
    fn publish(&self, envelope: EventEnvelope) {
        tracing::debug!(
            kind = envelope.event.kind(),
            channel_id = %envelope.channel_id,
            "publishing event"
        );

        let mut orphaned = false;
        if let Some(tx) = self.channels.get(&envelope.channel_id) {
            orphaned = tx.send(envelope.clone()).is_err();
        }
        if orphaned {
            self.channels
                .remove_if(&envelope.channel_id, |_, tx| tx.receiver_count() == 0);
        }

        // No global subscribers is not an error.
        let _ = self.global.send(envelope);
    }
}
