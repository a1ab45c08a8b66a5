//! Structured logging field name constants for qdesk.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), leadership transitions |
//! | DEBUG | Decision points, gate verdicts, config choices |
//! | TRACE | Per-tick evaluation, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Tab identity (UUID, per-process lifetime).
pub const TAB_ID: &str = "tab_id";

/// Subsystem originating the log event.
/// Values: "lease", "scheduler", "transport", "announcer", "cooldown",
/// "duplicates", "session", "client"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "try_claim", "tick", "publish", "apply", "announce"
pub const OPERATION: &str = "op";

// ─── Coordination fields ───────────────────────────────────────────────────

/// Leadership capability ("poll", "speaker").
pub const CAPABILITY: &str = "capability";

/// Scope partition key ("window:<id>" / "department:<id>").
pub const SCOPE: &str = "scope";

/// Snapshot coordination timestamp (epoch ms).
pub const SNAPSHOT_TS: &str = "snapshot_ts";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Ticket id being announced or acted on.
pub const TICKET_ID: &str = "ticket_id";

/// Queue number of a ticket.
pub const QUEUE_NUMBER: &str = "queue_number";

/// Cooldown key (caller-composed).
pub const COOLDOWN_KEY: &str = "cooldown_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Remaining countdown in milliseconds.
pub const REMAINING_MS: &str = "remaining_ms";
