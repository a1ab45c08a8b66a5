//! Centralized default constants for the qdesk console.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. When adding new constants, place them in the appropriate
//! section and document the rationale for the chosen value.

// =============================================================================
// LEADERSHIP
// =============================================================================

/// Heartbeat interval for lease renewal in milliseconds.
///
/// Decoupled from the poll interval so leadership outlives brief gaps in a
/// consumer's own schedule. Must be well under `LEASE_TTL_MS` so a healthy
/// tab renews at least twice before its lease could expire.
pub const HEARTBEAT_INTERVAL_MS: u64 = 3_500;

/// Lease time-to-live in milliseconds.
///
/// A lease older than this is expired and claimable by any tab. TTL expiry
/// is the *only* release mechanism: a closing tab simply stops renewing,
/// because unload hooks are not guaranteed to fire.
pub const LEASE_TTL_MS: i64 = 10_000;

/// Capability name for the exclusive polling role.
pub const CAP_POLL: &str = "poll";

/// Capability name for the exclusive announcement role.
pub const CAP_SPEAKER: &str = "speaker";

// =============================================================================
// POLLING
// =============================================================================

/// Default queue-state poll interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 10_000;

/// Cadence at which the scheduler driver re-evaluates due-ness and the UI
/// countdown, in milliseconds.
pub const DRIVER_TICK_MS: u64 = 100;

/// Minimum gap between user-visible fetch-error notifications in
/// milliseconds. Sustained outages surface one toast per window instead of
/// one per failed tick.
pub const FETCH_ERROR_THROTTLE_MS: i64 = 15_000;

// =============================================================================
// COOLDOWNS
// =============================================================================

/// Cadence for live cooldown countdown recomputation, in milliseconds.
pub const COOLDOWN_TICK_MS: u64 = 250;

/// Default cooldown for joining a queue, in milliseconds.
pub const JOIN_COOLDOWN_MS: i64 = 15_000;

/// Default cooldown for manual refresh, in milliseconds.
pub const REFRESH_COOLDOWN_MS: i64 = 5_000;

/// Default cooldown for ticket lookup, in milliseconds.
pub const LOOKUP_COOLDOWN_MS: i64 = 3_000;

// =============================================================================
// EVENTS
// =============================================================================

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Default snapshot transport channel capacity.
pub const TRANSPORT_CAPACITY: usize = 64;

// =============================================================================
// QUEUE SETTINGS FALLBACKS
// =============================================================================

/// Up-next list length when the server omits a setting.
pub const UP_NEXT_COUNT: u32 = 3;

/// Maximum hold attempts when the server omits a setting.
pub const MAX_HOLD_ATTEMPTS: u32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_renews_within_ttl() {
        // A healthy tab must renew at least twice before its lease expires.
        assert!((HEARTBEAT_INTERVAL_MS as i64) * 2 < LEASE_TTL_MS);
    }

    #[test]
    fn driver_tick_is_finer_than_poll_interval() {
        assert!(DRIVER_TICK_MS < POLL_INTERVAL_MS);
        assert!(COOLDOWN_TICK_MS < JOIN_COOLDOWN_MS as u64);
    }

    #[test]
    fn capabilities_are_distinct() {
        assert_ne!(CAP_POLL, CAP_SPEAKER);
    }
}
