//! TTL-lease leadership over the shared store.
//!
//! Each coordination capability ("poll", "speaker") has one lease record in
//! shared storage. Tabs renew their claims on a fixed heartbeat, decoupled
//! from any consumer's own interval; a tab that closes simply stops
//! renewing and the TTL is the sole recovery mechanism.
//!
//! The store has no compare-and-swap, so two tabs heartbeating at the same
//! instant over an absent/expired record may both observe "claimable" and
//! both believe they lead until the next heartbeat reconciles it
//! (last-writer-wins). Leadership is eventually exclusive within one
//! heartbeat period, not instantaneously exclusive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use qdesk_core::{Clock, CoordEvent, EventBus, SharedStore};

use crate::identity::TabId;

/// One leadership claim, serialized as JSON under
/// `lease:<scope>:<capability>`.
///
/// Overwritten on every renewal; never explicitly deleted. A record older
/// than the TTL is expired and claimable by anyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub capability: String,
    pub holder_id: String,
    /// Claim/renewal instant in epoch milliseconds.
    pub claimed_at: i64,
}

/// Leases are partitioned by scope: tabs serving different windows
/// coordinate independently, one record per capability within a scope.
fn lease_key(scope_key: &str, capability: &str) -> String {
    format!("lease:{scope_key}:{capability}")
}

/// Claims and renews capability leases; answers `is_leader` for consumers.
///
/// If the underlying store is unavailable, `try_claim` returns true
/// unconditionally: the feature degrades to "every tab acts as if it were
/// the only one" rather than breaking.
pub struct LeaseManager {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    tab_id: TabId,
    scope_key: String,
    ttl_ms: i64,
    held: HashMap<String, AtomicBool>,
    bus: Arc<EventBus>,
    store_degraded: AtomicBool,
}

impl LeaseManager {
    pub fn new(
        store: Arc<dyn SharedStore>,
        clock: Arc<dyn Clock>,
        tab_id: TabId,
        scope_key: impl Into<String>,
        capabilities: &[&str],
        ttl_ms: i64,
        bus: Arc<EventBus>,
    ) -> Self {
        let held = capabilities
            .iter()
            .map(|c| (c.to_string(), AtomicBool::new(false)))
            .collect();
        Self {
            store,
            clock,
            tab_id,
            scope_key: scope_key.into(),
            ttl_ms,
            held,
            bus,
            store_degraded: AtomicBool::new(false),
        }
    }

    /// Attempt to claim or renew the lease for `capability`.
    ///
    /// Returns true (after writing a fresh record) when the record is
    /// absent, expired, or already held by this tab; false otherwise with
    /// no write.
    pub fn try_claim(&self, capability: &str) -> bool {
        let now = self.clock.now_ms();
        let key = lease_key(&self.scope_key, capability);

        let raw = match self.store.get(&key) {
            Ok(raw) => raw,
            Err(e) => {
                self.warn_degraded(&e);
                return true;
            }
        };

        let claimable = match raw.and_then(|r| serde_json::from_str::<LeaseRecord>(&r).ok()) {
            // Absent or unparsable records are claimable.
            None => true,
            Some(rec) => {
                rec.holder_id == self.tab_id.to_string() || now - rec.claimed_at > self.ttl_ms
            }
        };
        if !claimable {
            return false;
        }

        let record = LeaseRecord {
            capability: capability.to_string(),
            holder_id: self.tab_id.to_string(),
            claimed_at: now,
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!(capability, error = %e, "failed to serialize lease record");
                return true;
            }
        };
        match self.store.put(&key, &json) {
            Ok(()) => {
                debug!(capability, tab_id = %self.tab_id, "lease claimed");
                true
            }
            Err(e) => {
                self.warn_degraded(&e);
                true
            }
        }
    }

    /// Run one heartbeat round: renew every registered capability and
    /// record leadership transitions.
    pub fn heartbeat(&self) {
        for (capability, flag) in &self.held {
            let holds = self.try_claim(capability);
            let previous = flag.swap(holds, Ordering::SeqCst);
            if holds != previous {
                if holds {
                    info!(capability, tab_id = %self.tab_id, "leadership acquired");
                    self.bus.emit(CoordEvent::LeaderAcquired {
                        capability: capability.clone(),
                    });
                } else {
                    info!(capability, tab_id = %self.tab_id, "leadership lost");
                    self.bus.emit(CoordEvent::LeaderLost {
                        capability: capability.clone(),
                    });
                }
            }
        }
    }

    /// Whether this tab held the capability as of the last heartbeat.
    pub fn is_leader(&self, capability: &str) -> bool {
        self.held
            .get(capability)
            .map(|f| f.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Start the heartbeat loop and return a handle for shutdown.
    pub fn start(self: Arc<Self>, interval: Duration) -> LeaseHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let manager = self;
        tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "lease heartbeat started");
            loop {
                manager.heartbeat();
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("lease heartbeat stopped");
                        break;
                    }
                    _ = sleep(interval) => {}
                }
            }
        });
        LeaseHandle { shutdown_tx }
    }

    fn warn_degraded(&self, error: &qdesk_core::Error) {
        // Warn once, not on every heartbeat.
        if !self.store_degraded.swap(true, Ordering::SeqCst) {
            warn!(error = %error, "lease store unavailable, assuming sole leadership");
        }
    }
}

/// Handle for stopping a running heartbeat loop.
pub struct LeaseHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl LeaseHandle {
    /// Signal the heartbeat loop to stop. Any leases simply expire.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
