//! Coordination event types and event bus.
//!
//! A single broadcast channel aggregates events from the lease manager,
//! poll driver, announcer, and duplicate detector. Downstream consumers
//! (UI toasts, countdown widgets, telemetry) subscribe independently.

use serde::Serialize;
use tokio::sync::broadcast;

/// Unified coordination event emitted by the session's components.
///
/// Serialized as JSON with a `type` tag field, e.g.
/// `{"type":"LeaderAcquired","capability":"poll"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CoordEvent {
    /// This tab became leader for a capability.
    LeaderAcquired { capability: String },
    /// This tab lost leadership for a capability.
    LeaderLost { capability: String },
    /// A snapshot passed the scope/timestamp gate and was applied.
    SnapshotApplied { scope_key: String, timestamp: i64 },
    /// A freshly fetched snapshot was published to sibling tabs.
    SnapshotPublished { scope_key: String, timestamp: i64 },
    /// A poll fetch failed. `surfaced` is true when the failure passed the
    /// toast throttle and should be shown to the user.
    FetchFailed { error: String, surfaced: bool },
    /// A ticket announcement was spoken by this tab.
    Announced { queue_number: u32, utterance: String },
    /// Speech synthesis is unavailable on this device (emitted once).
    SpeechUnavailable,
    /// Duplicate active tickets detected in the current snapshot.
    /// `warned` is false when duplicates are allowed by policy or the
    /// detector is still in its dirty period.
    DuplicatesDetected { groups: usize, warned: bool },
}

impl CoordEvent {
    /// Returns the event type name (used for filtering and logging).
    pub fn event_type(&self) -> &'static str {
        match self {
            CoordEvent::LeaderAcquired { .. } => "LeaderAcquired",
            CoordEvent::LeaderLost { .. } => "LeaderLost",
            CoordEvent::SnapshotApplied { .. } => "SnapshotApplied",
            CoordEvent::SnapshotPublished { .. } => "SnapshotPublished",
            CoordEvent::FetchFailed { .. } => "FetchFailed",
            CoordEvent::Announced { .. } => "Announced",
            CoordEvent::SpeechUnavailable => "SpeechUnavailable",
            CoordEvent::DuplicatesDetected { .. } => "DuplicatesDetected",
        }
    }
}

/// Broadcast-based event bus for distributing coordination events.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. Slow
/// receivers that fall behind will receive a `Lagged` error and miss
/// events — acceptable for real-time UI streams where freshness matters
/// more than completeness.
pub struct EventBus {
    tx: broadcast::Sender<CoordEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers.
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub fn emit(&self, event: CoordEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "event emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
