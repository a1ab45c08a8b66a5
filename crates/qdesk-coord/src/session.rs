//! Tab session: wires leadership, polling, transport, announcements, and
//! duplicate detection into one running unit per tab.
//!
//! Control flow: the lease heartbeat supplies leadership booleans; the
//! driver loop polls when this tab leads "poll" and hands each fetched
//! snapshot to the transport; every tab (fetcher and siblings alike)
//! applies snapshots through the same gate and drives its own announcer
//! and duplicate detector off the shared view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use qdesk_core::{
    defaults, Clock, CoordEvent, EventBus, QueueService, QueueState, Scope, SharedStore,
    Snapshot, SpeechSynthesizer,
};

use crate::announcer::Announcer;
use crate::cooldown::CooldownGuard;
use crate::duplicates::DuplicateDetector;
use crate::identity::TabId;
use crate::lease::{LeaseHandle, LeaseManager};
use crate::scheduler::PollScheduler;
use crate::throttle::Throttle;
use crate::transport::{SnapshotGate, SnapshotTransport};

// =============================================================================
// CONFIG
// =============================================================================

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Queue-state poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Lease renewal heartbeat in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Lease time-to-live in milliseconds.
    pub lease_ttl_ms: i64,
    /// Whether polling starts enabled.
    pub auto_refresh: bool,
    /// Whether announcements start audible (requires speech support).
    pub audio_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            heartbeat_interval_ms: defaults::HEARTBEAT_INTERVAL_MS,
            lease_ttl_ms: defaults::LEASE_TTL_MS,
            auto_refresh: true,
            audio_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `QDESK_POLL_INTERVAL_MS` | `10000` | Queue-state poll interval |
    /// | `QDESK_HEARTBEAT_INTERVAL_MS` | `3500` | Lease renewal heartbeat |
    /// | `QDESK_LEASE_TTL_MS` | `10000` | Lease time-to-live |
    /// | `QDESK_AUTO_REFRESH` | `true` | Start with polling enabled |
    /// | `QDESK_AUDIO_ENABLED` | `true` | Start with announcements audible |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QDESK_POLL_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(v) => config.poll_interval_ms = v.max(1_000),
                Err(_) => tracing::warn!(value = %val, "Invalid QDESK_POLL_INTERVAL_MS, using default"),
            }
        }

        if let Ok(val) = std::env::var("QDESK_HEARTBEAT_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(v) => config.heartbeat_interval_ms = v.max(500),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid QDESK_HEARTBEAT_INTERVAL_MS, using default")
                }
            }
        }

        if let Ok(val) = std::env::var("QDESK_LEASE_TTL_MS") {
            match val.parse::<i64>() {
                Ok(v) => config.lease_ttl_ms = v.max(1_000),
                Err(_) => tracing::warn!(value = %val, "Invalid QDESK_LEASE_TTL_MS, using default"),
            }
        }

        if let Ok(val) = std::env::var("QDESK_AUTO_REFRESH") {
            config.auto_refresh = val != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("QDESK_AUDIO_ENABLED") {
            config.audio_enabled = val != "false" && val != "0";
        }

        config
    }
}

// =============================================================================
// SHARED STATE
// =============================================================================

struct SessionShared {
    scope: Scope,
    scheduler: Mutex<PollScheduler>,
    gate: Mutex<SnapshotGate>,
    current: RwLock<Option<QueueState>>,
    announcer: Mutex<Announcer>,
    duplicates: Mutex<DuplicateDetector>,
    error_throttle: Mutex<Throttle>,
    visible: AtomicBool,
    audio_enabled: AtomicBool,
    refresh_requested: AtomicBool,
}

impl SessionShared {
    /// Apply a snapshot (fetched or received) through the gate, then drive
    /// the announcer and duplicate detector off the new view.
    fn apply(&self, snapshot: &Snapshot, leases: &LeaseManager, bus: &EventBus) -> bool {
        let admitted = {
            let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            gate.admit(snapshot)
        };
        if !admitted {
            return false;
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.state.clone());
        bus.emit(CoordEvent::SnapshotApplied {
            scope_key: snapshot.scope_key.clone(),
            timestamp: snapshot.timestamp,
        });

        if let Some(ticket) = &snapshot.state.now_serving {
            let may_speak = leases.is_leader(defaults::CAP_SPEAKER)
                && self.audio_enabled.load(Ordering::SeqCst);
            let mut announcer = self.announcer.lock().unwrap_or_else(PoisonError::into_inner);
            announcer.observe(ticket, may_speak);
        }

        let report = {
            let mut detector = self.duplicates.lock().unwrap_or_else(PoisonError::into_inner);
            detector.scan(&snapshot.state)
        };
        if !report.groups.is_empty() {
            if report.warn {
                warn!(
                    scope = %snapshot.scope_key,
                    groups = report.groups.len(),
                    "duplicate active tickets detected"
                );
            }
            bus.emit(CoordEvent::DuplicatesDetected {
                groups: report.groups.len(),
                warned: report.warn,
            });
        }

        true
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One tab's coordination runtime.
pub struct TabSession {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    service: Arc<dyn QueueService>,
    store: Arc<dyn SharedStore>,
    transport: Arc<dyn SnapshotTransport>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    scope: Scope,
    tab_id: TabId,
}

impl TabSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: Scope,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        service: Arc<dyn QueueService>,
        store: Arc<dyn SharedStore>,
        transport: Arc<dyn SnapshotTransport>,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        Self {
            config,
            clock,
            service,
            store,
            transport,
            speech,
            scope,
            tab_id: TabId::generate(),
        }
    }

    /// Start the heartbeat, driver, and receive loops; returns the control
    /// handle. Shutdown ends the loops structurally — no further ticks
    /// fire, rather than firing with ignored output.
    pub fn start(self) -> SessionHandle {
        let bus = Arc::new(EventBus::default());
        let leases = Arc::new(LeaseManager::new(
            self.store.clone(),
            self.clock.clone(),
            self.tab_id,
            self.scope.key(),
            &[defaults::CAP_POLL, defaults::CAP_SPEAKER],
            self.config.lease_ttl_ms,
            bus.clone(),
        ));

        let mut scheduler = PollScheduler::new(self.clock.clone(), self.config.poll_interval_ms as i64);
        if self.config.auto_refresh {
            scheduler.enable();
        }

        let audio = self.config.audio_enabled && self.speech.is_some();
        let shared = Arc::new(SessionShared {
            scope: self.scope,
            scheduler: Mutex::new(scheduler),
            gate: Mutex::new(SnapshotGate::new(self.scope.key())),
            current: RwLock::new(None),
            announcer: Mutex::new(Announcer::new(self.speech.clone(), bus.clone())),
            duplicates: Mutex::new(DuplicateDetector::new()),
            error_throttle: Mutex::new(Throttle::new(defaults::FETCH_ERROR_THROTTLE_MS)),
            visible: AtomicBool::new(true),
            audio_enabled: AtomicBool::new(audio),
            refresh_requested: AtomicBool::new(false),
        });

        info!(
            tab_id = %self.tab_id,
            scope = %self.scope,
            poll_interval_ms = self.config.poll_interval_ms,
            "tab session starting"
        );

        let lease_handle = leases
            .clone()
            .start(Duration::from_millis(self.config.heartbeat_interval_ms));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Driver loop: due-ness is re-evaluated on a fine cadence so the
        // countdown stays live and visibility changes need no event wiring.
        {
            let shared = shared.clone();
            let leases = leases.clone();
            let bus = bus.clone();
            let service = self.service.clone();
            let transport = self.transport.clone();
            let clock = self.clock.clone();
            let scope = self.scope;
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = sleep(Duration::from_millis(defaults::DRIVER_TICK_MS)) => {}
                    }

                    let manual = shared.refresh_requested.swap(false, Ordering::SeqCst);
                    let visible = shared.visible.load(Ordering::SeqCst);
                    let should_fetch = {
                        let mut scheduler = shared.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
                        if manual {
                            // Manual refresh fetches regardless of poll
                            // leadership and pushes the countdown forward.
                            scheduler.reschedule_from_now();
                            true
                        } else if scheduler.due(visible) {
                            if leases.is_leader(defaults::CAP_POLL) {
                                scheduler.begin_fetch();
                                true
                            } else {
                                // Sibling tabs ride the leader's broadcasts;
                                // keep their own countdown turning over.
                                scheduler.reschedule_from_now();
                                false
                            }
                        } else {
                            false
                        }
                    };
                    if !should_fetch {
                        continue;
                    }

                    match service.fetch_state(scope).await {
                        Ok(state) => {
                            let snapshot = Snapshot {
                                scope_key: scope.key(),
                                timestamp: clock.now_ms(),
                                state,
                            };
                            // Apply locally first so the transport echo of
                            // our own publish is dropped as stale.
                            shared.apply(&snapshot, &leases, &bus);
                            if let Err(e) = transport.publish(&snapshot) {
                                warn!(error = %e, "snapshot publish failed");
                            } else {
                                bus.emit(CoordEvent::SnapshotPublished {
                                    scope_key: snapshot.scope_key.clone(),
                                    timestamp: snapshot.timestamp,
                                });
                            }
                        }
                        Err(e) => {
                            let surfaced = {
                                let mut throttle =
                                    shared.error_throttle.lock().unwrap_or_else(PoisonError::into_inner);
                                throttle.allow(clock.now_ms())
                            };
                            if surfaced {
                                warn!(error = %e, "queue state fetch failed");
                            }
                            bus.emit(CoordEvent::FetchFailed {
                                error: e.to_string(),
                                surfaced,
                            });
                        }
                    }

                    let mut scheduler = shared.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
                    scheduler.complete_fetch();
                }
            });
        }

        // Receive loop: snapshots published by sibling tabs.
        {
            let shared = shared.clone();
            let leases = leases.clone();
            let bus = bus.clone();
            let mut rx = self.transport.subscribe();
            let mut shutdown = shutdown_rx;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        received = rx.recv() => match received {
                            Ok(snapshot) => {
                                shared.apply(&snapshot, &leases, &bus);
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                                // Skipped snapshots are superseded anyway.
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            });
        }

        SessionHandle {
            shared,
            bus,
            leases,
            lease_handle,
            cooldowns: CooldownGuard::new(self.store, self.clock),
            shutdown_tx,
            tab_id: self.tab_id,
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Handle for controlling a running tab session.
pub struct SessionHandle {
    shared: Arc<SessionShared>,
    bus: Arc<EventBus>,
    leases: Arc<LeaseManager>,
    lease_handle: LeaseHandle,
    cooldowns: CooldownGuard,
    shutdown_tx: watch::Sender<bool>,
    tab_id: TabId,
}

impl SessionHandle {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn scope(&self) -> Scope {
        self.shared.scope
    }

    /// Subscribe to coordination events.
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<CoordEvent> {
        self.bus.subscribe()
    }

    /// The last applied queue state, if any snapshot has been admitted.
    pub fn state(&self) -> Option<QueueState> {
        self.shared.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Countdown to the next scheduled fetch, `None` while auto-refresh is
    /// off. Recomputed by callers on a short cadence for display.
    pub fn remaining_ms(&self) -> Option<i64> {
        self.shared.scheduler.lock().unwrap_or_else(PoisonError::into_inner).remaining_ms()
    }

    /// Whether this tab currently holds the given capability lease.
    pub fn is_leader(&self, capability: &str) -> bool {
        self.leases.is_leader(capability)
    }

    /// Request an immediate fetch on the next driver tick.
    pub fn refresh_now(&self) {
        self.shared.refresh_requested.store(true, Ordering::SeqCst);
    }

    /// Enable or disable auto-refresh. Enabling resets the countdown to a
    /// full interval; disabling prevents any further scheduled fetches.
    pub fn set_auto_refresh(&self, enabled: bool) {
        let mut scheduler = self.shared.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if enabled {
            scheduler.enable();
        } else {
            scheduler.disable();
        }
    }

    /// Report document visibility; hidden tabs skip scheduled fetches.
    pub fn set_visible(&self, visible: bool) {
        self.shared.visible.store(visible, Ordering::SeqCst);
    }

    /// Toggle announcement audio. Returns the effective value — always
    /// false when speech synthesis is unavailable on this device.
    pub fn set_audio_enabled(&self, enabled: bool) -> bool {
        let available = self
            .shared
            .announcer
            .lock()
            .expect("announcer lock")
            .speech_available();
        let effective = enabled && available;
        self.shared.audio_enabled.store(effective, Ordering::SeqCst);
        effective
    }

    /// Re-speak the last announcement (no deduplication).
    pub fn recall_announcement(&self) -> bool {
        self.shared.announcer.lock().unwrap_or_else(PoisonError::into_inner).recall()
    }

    /// Cooldown guard for user-triggered actions.
    pub fn cooldowns(&self) -> &CooldownGuard {
        &self.cooldowns
    }

    /// Stop all loops. Held leases are not released; they expire by TTL.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        self.lease_handle.shutdown().await;
        info!(tab_id = %self.tab_id, "tab session stopped");
    }
}
