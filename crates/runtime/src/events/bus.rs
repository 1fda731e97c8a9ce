//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

use super::types::{GrantEvent, ScanEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Scan cycle lifecycle (cycles, waits, failsafe, pause)
    Scan,
    /// Grants, revokes, locks and activations
    Grant,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Scan(ScanEvent),
    Grant(GrantEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Scan(_) => Topic::Scan,
            Event::Grant(_) => Topic::Grant,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Cloning shares the underlying channels.
#[derive(Clone)]
pub struct EventBus {
    scan: broadcast::Sender<Event>,
    grant: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scan: broadcast::channel(capacity).0,
            grant: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Scan => &self.scan,
            Topic::Grant => &self.grant,
        }
    }

    /// Publish an event to its corresponding topic
    ///
    /// Best-effort: an event with no subscribers is dropped.
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    pub fn publish_scan(&self, event: ScanEvent) {
        self.publish(Event::Scan(event));
    }

    pub fn publish_grant(&self, event: GrantEvent) {
        self.publish(Event::Grant(event));
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    ///
    /// Returns receivers for each requested topic.
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_route_by_topic() {
        let bus = EventBus::new();
        let mut scan_rx = bus.subscribe(Topic::Scan);
        let mut grant_rx = bus.subscribe(Topic::Grant);

        bus.publish_scan(ScanEvent::Paused);

        assert_eq!(scan_rx.recv().await.ok(), Some(Event::Scan(ScanEvent::Paused)));
        assert!(grant_rx.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::with_capacity(4);
        bus.publish_scan(ScanEvent::Resumed);
    }
}
