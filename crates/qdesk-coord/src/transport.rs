//! Cross-tab snapshot transport.
//!
//! A freshly fetched snapshot is propagated to sibling tabs through one of
//! two paths, unified behind [`SnapshotTransport`]: a low-latency broadcast
//! channel when the runtime provides one, or a single shared storage key
//! whose change notifications sibling tabs convert back into messages.
//! Which implementation backs a tab is decided once, at construction.
//!
//! Delivery is best-effort and unordered on both paths. The receive side
//! makes application safe anyway: [`SnapshotGate`] drops mismatched-scope
//! messages silently and rejects anything at or below the highest
//! timestamp already applied, so replays, duplicates, and out-of-order
//! delivery are all no-ops.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use qdesk_core::{Error, Result, SharedStore, Snapshot};

/// Storage key carrying the latest published snapshot for a scope.
fn snapshot_key(scope_key: &str) -> String {
    format!("snapshot:{scope_key}")
}

/// Unified publish/subscribe surface over both delivery paths.
pub trait SnapshotTransport: Send + Sync {
    /// Fire-and-forget delivery to sibling tabs. No delivery guarantee.
    fn publish(&self, snapshot: &Snapshot) -> Result<()>;

    /// Receive snapshots published by sibling tabs (and, on some paths,
    /// echoes of this tab's own publishes — the gate handles those).
    fn subscribe(&self) -> broadcast::Receiver<Snapshot>;
}

// =============================================================================
// BROADCAST CHANNEL PATH
// =============================================================================

/// Low-latency same-origin broadcast primitive.
///
/// All tabs of one origin share a clone of the same transport, the way
/// browser tabs share a named `BroadcastChannel`.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: broadcast::Sender<Snapshot>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(qdesk_core::defaults::TRANSPORT_CAPACITY)
    }
}

impl SnapshotTransport for ChannelTransport {
    fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        // send fails only when no receiver exists, which is fine for
        // fire-and-forget delivery.
        let _ = self.tx.send(snapshot.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

// =============================================================================
// STORAGE FALLBACK PATH
// =============================================================================

/// Storage-backed fallback: publishes by writing one shared key, receives
/// by converting store change notifications back into snapshots.
pub struct StoreTransport {
    store: Arc<dyn SharedStore>,
    tx: broadcast::Sender<Snapshot>,
}

impl StoreTransport {
    /// Create the transport and start its notification forwarder.
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        let (tx, _) = broadcast::channel(qdesk_core::defaults::TRANSPORT_CAPACITY);
        let forward_tx = tx.clone();
        let mut watch = store.watch();
        tokio::spawn(async move {
            loop {
                match watch.recv().await {
                    Ok(change) => {
                        if !change.key.starts_with("snapshot:") {
                            continue;
                        }
                        let Some(raw) = change.value else { continue };
                        match serde_json::from_str::<Snapshot>(&raw) {
                            Ok(snapshot) => {
                                let _ = forward_tx.send(snapshot);
                            }
                            Err(e) => {
                                warn!(key = %change.key, error = %e, "unreadable snapshot in store");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Older snapshots are superseded anyway.
                        trace!(missed, "store watch lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self { store, tx }
    }
}

impl SnapshotTransport for StoreTransport {
    fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.store
            .put(&snapshot_key(&snapshot.scope_key), &json)
            .map_err(|e| Error::Transport(e.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

/// Select the delivery path available in this runtime, channel preferred.
pub fn detect_transport(
    channel: Option<ChannelTransport>,
    store: Arc<dyn SharedStore>,
) -> Arc<dyn SnapshotTransport> {
    match channel {
        Some(channel) => {
            debug!("snapshot transport: broadcast channel");
            Arc::new(channel)
        }
        None => {
            debug!("snapshot transport: storage fallback");
            Arc::new(StoreTransport::new(store))
        }
    }
}

// =============================================================================
// RECEIVE-SIDE GATE
// =============================================================================

/// Scope and monotonicity filter applied before any snapshot reaches
/// downstream logic.
#[derive(Debug)]
pub struct SnapshotGate {
    scope_key: String,
    last_applied: Option<i64>,
}

impl SnapshotGate {
    pub fn new(scope_key: String) -> Self {
        Self {
            scope_key,
            last_applied: None,
        }
    }

    /// Admit a snapshot if it belongs to this tab's scope and is strictly
    /// newer than everything applied so far. Admission records the
    /// timestamp, making application idempotent and order-insensitive.
    pub fn admit(&mut self, snapshot: &Snapshot) -> bool {
        if snapshot.scope_key != self.scope_key {
            trace!(
                scope = %snapshot.scope_key,
                local = %self.scope_key,
                "snapshot for foreign scope ignored"
            );
            return false;
        }
        if self.last_applied.is_some_and(|last| snapshot.timestamp <= last) {
            trace!(
                snapshot_ts = snapshot.timestamp,
                last_applied = self.last_applied,
                "stale snapshot dropped"
            );
            return false;
        }
        self.last_applied = Some(snapshot.timestamp);
        true
    }

    pub fn last_applied(&self) -> Option<i64> {
        self.last_applied
    }
}
