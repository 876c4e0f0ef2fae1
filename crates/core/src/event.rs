//! Domain event system — progress notifications from the control loop.
//!
//! Events are published as the loop moves through its phases. Observers
//! (CLI progress output, tests) subscribe without the loop knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An action was dispatched to its capability
    ActionDispatched {
        session_id: String,
        action: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An action was skipped because required arguments were missing
    ActionSkipped {
        session_id: String,
        action: String,
        missing: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A dispatched action's result was merged into session state
    ObservationReduced {
        session_id: String,
        action: String,
        applied: bool,
        polls_completed: u32,
        timestamp: DateTime<Utc>,
    },

    /// The loop is waiting before the next poll
    PollWaiting {
        session_id: String,
        seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// The loop reached a terminal state
    SessionFinished {
        session_id: String,
        outcome: String,
        polls_completed: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ActionSkipped {
            session_id: "s1".into(),
            action: "select_deal".into(),
            missing: vec!["candidates".into()],
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ActionSkipped { action, missing, .. } => {
                assert_eq!(action, "select_deal");
                assert_eq!(missing, &vec!["candidates".to_string()]);
            }
            _ => panic!("Expected ActionSkipped event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::PollWaiting {
            session_id: "s1".into(),
            seconds: 10,
            timestamp: Utc::now(),
        });
    }
}
