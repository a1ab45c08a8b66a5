//! Minimum-gap throttle for user-visible warnings.
//!
//! Fetch-error toasts and duplicate warnings must not flood the operator
//! during sustained conditions; this gate admits at most one event per
//! configured window.

/// Admits at most one event per `min_gap_ms` window.
#[derive(Debug)]
pub struct Throttle {
    min_gap_ms: i64,
    last_at: Option<i64>,
}

impl Throttle {
    pub fn new(min_gap_ms: i64) -> Self {
        Self {
            min_gap_ms,
            last_at: None,
        }
    }

    /// Returns true and records the instant if the gap since the last
    /// admitted event is at least the configured window.
    pub fn allow(&mut self, now_ms: i64) -> bool {
        match self.last_at {
            Some(last) if now_ms - last < self.min_gap_ms => false,
            _ => {
                self.last_at = Some(now_ms);
                true
            }
        }
    }
}
