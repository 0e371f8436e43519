//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PlatformEvent`]s. Share it
//! via `Arc<EventBus>` between the service and the scheduler.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tenantry_core::types::{EntityId, Timestamp};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event envelope.
///
/// Constructed via [`PlatformEvent::new`] and enriched with the builder
/// methods [`with_source`](PlatformEvent::with_source),
/// [`with_actor`](PlatformEvent::with_actor),
/// [`with_payload`](PlatformEvent::with_payload), and
/// [`at`](PlatformEvent::at).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"onboarding.started"`.
    pub event_type: String,

    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<EntityId>,

    /// Who triggered the event, if anyone.
    pub actor: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl PlatformEvent {
    /// Create an event with only the required `event_type`, stamped now.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: EntityId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Override the timestamp, e.g. with the instant of an injected clock.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use tenantry_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("onboarding.created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread messages are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: PlatformEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
