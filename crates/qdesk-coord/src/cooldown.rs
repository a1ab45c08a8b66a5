//! Persisted cooldowns for user-triggered actions.
//!
//! A reusable rate limiter for join/refresh/lookup style actions, backed
//! by timestamps in the shared store so cooldowns survive page reloads.
//! Keys are caller-composed (action + scope + identity) so one
//! participant's cooldown never blocks another's.
//!
//! Advisory/UX-only: this reduces accidental repeated submissions, it is
//! not a substitute for server-side idempotency or authorization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use qdesk_core::{Clock, Result, SharedStore};

/// Persisted trigger record under `cooldown:<key>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CooldownRecord {
    last_triggered_at: i64,
}

fn cooldown_key(key: &str) -> String {
    format!("cooldown:{key}")
}

/// Reads and writes cooldown records; answers live countdown queries.
pub struct CooldownGuard {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
}

impl CooldownGuard {
    pub fn new(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record a trigger of the action now. Overwrites any prior record;
    /// conceptual expiry is purely by age, no deletion required.
    pub fn start(&self, key: &str) -> Result<()> {
        let record = CooldownRecord {
            last_triggered_at: self.clock.now_ms(),
        };
        self.store
            .put(&cooldown_key(key), &serde_json::to_string(&record)?)
    }

    /// Remaining cooldown in milliseconds, zero when expired or never
    /// triggered. Store failures degrade to "not cooling down" — the
    /// guard is advisory and must never block on a broken store.
    pub fn remaining_ms(&self, key: &str, duration_ms: i64) -> i64 {
        let raw = match self.store.get(&cooldown_key(key)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(cooldown_key = key, error = %e, "cooldown store unavailable");
                return 0;
            }
        };
        let Some(record) = raw.and_then(|r| serde_json::from_str::<CooldownRecord>(&r).ok())
        else {
            return 0;
        };
        (duration_ms - (self.clock.now_ms() - record.last_triggered_at)).max(0)
    }

    /// True while the action is still inside its cooldown window.
    pub fn is_cooling_down(&self, key: &str, duration_ms: i64) -> bool {
        self.remaining_ms(key, duration_ms) > 0
    }

    /// Remaining whole seconds (ceiling) for countdown display, recomputed
    /// by the caller on a short cadence.
    pub fn remaining_seconds(&self, key: &str, duration_ms: i64) -> i64 {
        let ms = self.remaining_ms(key, duration_ms);
        ms / 1_000 + i64::from(ms % 1_000 != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdesk_core::{ManualClock, MemoryStore, UnavailableStore};

    fn guard(clock: Arc<ManualClock>) -> CooldownGuard {
        CooldownGuard::new(Arc::new(MemoryStore::new()), clock)
    }

    #[test]
    fn cooldown_window_boundaries() {
        let clock = ManualClock::at(0);
        let g = guard(clock.clone());
        g.start("joinQ:deptA:participant7").unwrap();

        clock.set(14_000);
        assert!(g.is_cooling_down("joinQ:deptA:participant7", 15_000));
        clock.set(15_001);
        assert!(!g.is_cooling_down("joinQ:deptA:participant7", 15_000));
    }

    #[test]
    fn untriggered_key_is_not_cooling() {
        let clock = ManualClock::at(0);
        let g = guard(clock);
        assert!(!g.is_cooling_down("refresh:w1", 5_000));
        assert_eq!(g.remaining_seconds("refresh:w1", 5_000), 0);
    }

    #[test]
    fn keys_are_scoped_independently() {
        let clock = ManualClock::at(0);
        let g = guard(clock.clone());
        g.start("joinQ:deptA:p1").unwrap();
        clock.set(1_000);
        assert!(g.is_cooling_down("joinQ:deptA:p1", 15_000));
        assert!(!g.is_cooling_down("joinQ:deptA:p2", 15_000));
        assert!(!g.is_cooling_down("joinQ:deptB:p1", 15_000));
    }

    #[test]
    fn remaining_seconds_rounds_up() {
        let clock = ManualClock::at(0);
        let g = guard(clock.clone());
        g.start("lookup:t1").unwrap();
        clock.set(12_500);
        // 2500ms left -> 3 seconds displayed
        assert_eq!(g.remaining_seconds("lookup:t1", 15_000), 3);
        clock.set(14_000);
        assert_eq!(g.remaining_seconds("lookup:t1", 15_000), 1);
        clock.set(15_000);
        assert_eq!(g.remaining_seconds("lookup:t1", 15_000), 0);
    }

    #[test]
    fn retrigger_restarts_the_window() {
        let clock = ManualClock::at(0);
        let g = guard(clock.clone());
        g.start("refresh:w1").unwrap();
        clock.set(4_000);
        g.start("refresh:w1").unwrap();
        clock.set(8_999);
        assert!(g.is_cooling_down("refresh:w1", 5_000));
        clock.set(9_001);
        assert!(!g.is_cooling_down("refresh:w1", 5_000));
    }

    #[test]
    fn cooldown_survives_reload() {
        let clock = ManualClock::at(0);
        let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
        let before = CooldownGuard::new(store.clone(), clock.clone());
        before.start("joinQ:deptA:p1").unwrap();
        drop(before);

        // A freshly created guard over the same store (page reload) still
        // sees the running cooldown.
        let after = CooldownGuard::new(store, clock.clone());
        clock.set(10_000);
        assert!(after.is_cooling_down("joinQ:deptA:p1", 15_000));
    }

    #[test]
    fn unavailable_store_degrades_to_not_cooling() {
        let clock = ManualClock::at(0);
        let g = CooldownGuard::new(Arc::new(UnavailableStore::new()), clock);
        assert!(g.start("joinQ:d:p").is_err());
        assert!(!g.is_cooling_down("joinQ:d:p", 15_000));
    }
}
