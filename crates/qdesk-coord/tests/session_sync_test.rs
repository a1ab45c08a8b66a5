//! Multi-tab session integration: one poller, one speaker, shared view.
//!
//! Two tab sessions share a store, a broadcast transport, and a manual
//! clock, exactly as two browser tabs share an origin. Tokio time runs
//! paused so the driver/heartbeat loops execute deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use qdesk_coord::transport::{detect_transport, ChannelTransport};
use qdesk_coord::{SessionConfig, SessionHandle, TabSession};
use qdesk_core::{
    defaults, Clock, Department, ManualClock, MemoryStore, Participant, QueueService,
    QueueSettings, QueueState, Result, Scope, ServiceWindow, SharedStore, SpeechSynthesizer,
    TicketStatus, TicketView,
};

// =============================================================================
// FIXTURES
// =============================================================================

fn ticket(id: &str, number: u32) -> TicketView {
    TicketView {
        id: id.to_string(),
        queue_number: number,
        status: TicketStatus::Serving,
        department: Department {
            id: Uuid::nil(),
            name: "Registrar".to_string(),
            code: "R".to_string(),
        },
        participant: Some(Participant {
            id: Uuid::nil(),
            name: "Ana Cruz".to_string(),
        }),
        window: Some(ServiceWindow {
            id: Uuid::nil(),
            number: 3,
        }),
        called_at: None,
        served_at: None,
        out_at: None,
        hold_attempts: 0,
    }
}

fn queue_state(now_serving: Option<TicketView>) -> QueueState {
    QueueState {
        server_time: Utc::now(),
        date_key: "2026-08-07".to_string(),
        settings: QueueSettings::default(),
        now_serving,
        waiting: vec![],
        hold: vec![],
        called: vec![],
        up_next: vec![],
    }
}

/// Queue service returning a swappable canned state and counting fetches.
struct CannedQueueService {
    state: Mutex<QueueState>,
    fetches: AtomicUsize,
}

impl CannedQueueService {
    fn new(state: QueueState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            fetches: AtomicUsize::new(0),
        })
    }

    fn set_state(&self, state: QueueState) {
        *self.state.lock().unwrap() = state;
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueService for CannedQueueService {
    async fn fetch_state(&self, scope: Scope) -> Result<QueueState> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap().clone();
        // Stamp the serving scope so tests can tell whose snapshot a tab
        // ended up applying.
        state.date_key = scope.key();
        Ok(state)
    }

    async fn call_next(&self, _scope: Scope) -> Result<Option<TicketView>> {
        Ok(None)
    }

    async fn mark_served(&self, _id: &str) -> Result<Option<TicketView>> {
        Ok(None)
    }

    async fn hold(&self, _id: &str) -> Result<Option<TicketView>> {
        Ok(None)
    }

    async fn mark_out(&self, _id: &str) -> Result<Option<TicketView>> {
        Ok(None)
    }

    async fn return_from_hold(&self, _id: &str) -> Result<Option<TicketView>> {
        Ok(None)
    }
}

#[derive(Default)]
struct RecordingSpeech {
    utterances: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    fn count(&self) -> usize {
        self.utterances.lock().unwrap().len()
    }
}

impl SpeechSynthesizer for RecordingSpeech {
    fn speak(&self, text: &str) -> Result<()> {
        self.utterances.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        poll_interval_ms: 10_000,
        heartbeat_interval_ms: 3_500,
        lease_ttl_ms: 10_000,
        auto_refresh: true,
        audio_enabled: true,
    }
}

fn start_tab(
    scope: Scope,
    clock: &Arc<ManualClock>,
    service: &Arc<CannedQueueService>,
    store: &Arc<MemoryStore>,
    channel: &ChannelTransport,
    speech: &Arc<RecordingSpeech>,
) -> SessionHandle {
    let transport = detect_transport(
        Some(channel.clone()),
        store.clone() as Arc<dyn SharedStore>,
    );
    TabSession::new(
        scope,
        config(),
        clock.clone() as Arc<dyn Clock>,
        service.clone(),
        store.clone() as Arc<dyn SharedStore>,
        transport,
        Some(speech.clone()),
    )
    .start()
}

/// Let spawned loops run: paused tokio time auto-advances, so four
/// seconds covers ~40 driver ticks and at least one lease heartbeat
/// without any real waiting.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(4_000)).await;
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn single_poller_single_speaker_shared_view() {
    let scope = Scope::Window(Uuid::new_v4());
    let clock = ManualClock::at(1_000_000);
    let service = CannedQueueService::new(queue_state(Some(ticket("ticket-99", 99))));
    let store = Arc::new(MemoryStore::new());
    let channel = ChannelTransport::default();
    let speech_a = Arc::new(RecordingSpeech::default());
    let speech_b = Arc::new(RecordingSpeech::default());

    let a = start_tab(scope, &clock, &service, &store, &channel, &speech_a);
    settle().await;
    let b = start_tab(scope, &clock, &service, &store, &channel, &speech_b);
    settle().await;

    // First-started tab holds both capabilities.
    assert!(a.is_leader(defaults::CAP_POLL));
    assert!(a.is_leader(defaults::CAP_SPEAKER));
    assert!(!b.is_leader(defaults::CAP_POLL));
    assert!(!b.is_leader(defaults::CAP_SPEAKER));

    // One poll interval elapses: only the leader fetches, both tabs end
    // up with the same view, only the speaker announces.
    clock.advance(10_001);
    settle().await;

    assert_eq!(service.fetch_count(), 1);
    assert!(a.state().is_some());
    assert!(b.state().is_some());
    assert_eq!(
        b.state().unwrap().now_serving.unwrap().id,
        "ticket-99".to_string()
    );
    assert_eq!(speech_a.count(), 1);
    assert_eq!(speech_b.count(), 0);

    // The identical snapshot redelivered on the next poll does not
    // re-announce anywhere.
    clock.advance(10_001);
    settle().await;
    assert_eq!(service.fetch_count(), 2);
    assert_eq!(speech_a.count(), 1);
    assert_eq!(speech_b.count(), 0);

    // A new now-serving ticket is announced exactly once, by the speaker.
    service.set_state(queue_state(Some(ticket("ticket-100", 100))));
    clock.advance(10_001);
    settle().await;
    assert_eq!(speech_a.count(), 2);
    assert_eq!(speech_b.count(), 0);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn speaker_failover_does_not_replay_seen_tickets() {
    let scope = Scope::Window(Uuid::new_v4());
    let clock = ManualClock::at(1_000_000);
    let service = CannedQueueService::new(queue_state(Some(ticket("ticket-99", 99))));
    let store = Arc::new(MemoryStore::new());
    let channel = ChannelTransport::default();
    let speech_a = Arc::new(RecordingSpeech::default());
    let speech_b = Arc::new(RecordingSpeech::default());

    let a = start_tab(scope, &clock, &service, &store, &channel, &speech_a);
    settle().await;
    let b = start_tab(scope, &clock, &service, &store, &channel, &speech_b);
    settle().await;

    clock.advance(10_001);
    settle().await;
    assert_eq!(speech_a.count(), 1);
    // The non-speaker observed ticket-99 without a speech call.
    assert_eq!(speech_b.count(), 0);

    // The speaker closes; after its lease expires the survivor takes
    // both capabilities.
    a.shutdown().await;
    clock.advance(10_001 + 10_000);
    settle().await;
    assert!(b.is_leader(defaults::CAP_POLL));
    assert!(b.is_leader(defaults::CAP_SPEAKER));

    // ticket-99 was already marked seen on the survivor, so the next
    // snapshot carrying it stays silent.
    clock.advance(10_001);
    settle().await;
    assert_eq!(speech_b.count(), 0);

    // A genuinely new ticket is announced by the new speaker.
    service.set_state(queue_state(Some(ticket("ticket-100", 100))));
    clock.advance(10_001);
    settle().await;
    assert_eq!(speech_b.count(), 1);

    b.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn foreign_scope_snapshots_are_ignored() {
    let clock = ManualClock::at(1_000_000);
    let service = CannedQueueService::new(queue_state(None));
    let store = Arc::new(MemoryStore::new());
    let channel = ChannelTransport::default();
    let speech_a = Arc::new(RecordingSpeech::default());
    let speech_b = Arc::new(RecordingSpeech::default());

    // Two tabs assigned to different windows coordinate independently:
    // each leads its own scope and polls for itself.
    let scope_a = Scope::Window(Uuid::new_v4());
    let scope_b = Scope::Window(Uuid::new_v4());
    let a = start_tab(scope_a, &clock, &service, &store, &channel, &speech_a);
    settle().await;
    let b = start_tab(scope_b, &clock, &service, &store, &channel, &speech_b);
    settle().await;

    assert!(a.is_leader(defaults::CAP_POLL));
    assert!(b.is_leader(defaults::CAP_POLL));

    clock.advance(10_001);
    settle().await;
    assert_eq!(service.fetch_count(), 2);

    // Both publishes crossed the shared channel, but each tab kept only
    // the snapshot of its own scope.
    assert_eq!(a.state().unwrap().date_key, scope_a.key());
    assert_eq!(b.state().unwrap().date_key, scope_b.key());

    a.shutdown().await;
    b.shutdown().await;
}
