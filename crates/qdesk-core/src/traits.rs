//! Core traits for qdesk abstractions.
//!
//! These traits define the seams to the out-of-scope collaborators —
//! shared storage, the queue-service backend, speech synthesis — enabling
//! pluggable implementations and testability. Coordination logic depends
//! only on the interfaces, never on a concrete runtime capability.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::models::{QueueState, Scope, TicketView};

// =============================================================================
// SHARED KEY-VALUE STORE
// =============================================================================

/// A change notification emitted by a [`SharedStore`].
///
/// Mirrors browser storage events: the key that changed and its new value
/// (`None` on removal). Note that the in-process [`MemoryStore`] delivers
/// changes to *all* watchers including the writer; receivers must already
/// tolerate replays, so the echo is harmless.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    pub value: Option<String>,
}

/// Shared, origin-scoped persistent key-value storage.
///
/// Synchronous read/write with observable change notifications and *no*
/// atomic compare-and-swap — exactly the weak primitive the coordination
/// layer is designed around. Availability may vary (private browsing can
/// restrict storage); callers degrade per their own rules when an
/// operation returns [`Error::Storage`].
pub trait SharedStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Subscribe to change notifications.
    fn watch(&self) -> broadcast::Receiver<StoreChange>;
}

/// In-memory [`SharedStore`] backed by a mutexed map.
///
/// One instance shared across simulated tabs stands in for origin-scoped
/// browser storage in tests and single-process deployments.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(crate::defaults::EVENT_BUS_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("store mutex poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value: Some(value.to_string()),
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value: None,
        });
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

/// A [`SharedStore`] that fails every operation.
///
/// Stands in for storage-disabled runtimes in tests of the degraded paths
/// (assumed leadership, no cooldown persistence).
pub struct UnavailableStore {
    changes: broadcast::Sender<StoreChange>,
}

impl UnavailableStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(1);
        Self { changes }
    }
}

impl Default for UnavailableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::Storage("storage disabled".to_string()))
    }

    fn put(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Storage("storage disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(Error::Storage("storage disabled".to_string()))
    }

    fn watch(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

// =============================================================================
// QUEUE SERVICE
// =============================================================================

/// Server-authoritative queue operations consumed by the console.
///
/// `fetch_state` must be cheap and idempotent — it is called on every poll
/// tick. Mutating actions return `Ok(None)` for an explicit "none
/// available" outcome and must be safe under client retry; the cooldown
/// guard reduces accidental resubmission but the server keeps its own
/// idempotency checks.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Snapshot of queue state for the given scope.
    async fn fetch_state(&self, scope: Scope) -> Result<QueueState>;

    /// Call the next waiting ticket to the scope's window.
    async fn call_next(&self, scope: Scope) -> Result<Option<TicketView>>;

    /// Mark the now-serving ticket as served.
    async fn mark_served(&self, ticket_id: &str) -> Result<Option<TicketView>>;

    /// Put a called ticket on hold.
    async fn hold(&self, ticket_id: &str) -> Result<Option<TicketView>>;

    /// Mark a called ticket as out (no-show).
    async fn mark_out(&self, ticket_id: &str) -> Result<Option<TicketView>>;

    /// Return a held ticket to the called list.
    async fn return_from_hold(&self, ticket_id: &str) -> Result<Option<TicketView>>;
}

// =============================================================================
// SPEECH SYNTHESIS
// =============================================================================

/// Audible announcement output.
///
/// Feature-detected and entirely optional: absence disables only the audio
/// toggle, nothing else. Implementations receive the fully composed
/// utterance text.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str) -> Result<()>;
}
