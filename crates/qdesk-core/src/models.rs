//! Domain models for queue state as reported by the server.
//!
//! Everything here is read-only from the console's perspective: the server
//! owns ticket lifecycle, counters, and audit logging. The console only
//! consumes snapshots and renders/announces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// SCOPE
// =============================================================================

/// The partition key a tab cares about: its assigned service window, or a
/// department-wide fallback for managers without a window assignment.
///
/// Snapshots and leases are scoped by this key, so two windows of the same
/// origin never interfere with each other's coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// An assigned service window.
    Window(Uuid),
    /// Department-wide fallback (manager view).
    Department(Uuid),
}

impl Scope {
    /// The string key used for snapshot filtering and storage partitioning.
    pub fn key(&self) -> String {
        match self {
            Scope::Window(id) => format!("window:{id}"),
            Scope::Department(id) => format!("department:{id}"),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

// =============================================================================
// TICKETS
// =============================================================================

/// Server-side ticket status. The transitions between these are entirely
/// the server's business; the console never infers or advances them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Waiting,
    Hold,
    Called,
    Serving,
    Served,
    Out,
}

/// Department a ticket belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

/// Participant who pulled the ticket. Walk-ins may be anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
}

/// Service window a called ticket was assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    pub id: Uuid,
    pub number: u32,
}

/// Read-only view of one ticket as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketView {
    pub id: String,
    pub queue_number: u32,
    pub status: TicketStatus,
    pub department: Department,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<ServiceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hold_attempts: u32,
}

// =============================================================================
// QUEUE STATE
// =============================================================================

/// Operational settings the server reports alongside queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// How many upcoming tickets the up-next list carries.
    pub up_next_count: u32,
    /// Maximum times a ticket may be put on hold before it drops out.
    pub max_hold_attempts: u32,
    /// Whether duplicate active tickets per (department, number) are an
    /// expected policy rather than a data fault.
    pub allow_duplicates: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            up_next_count: defaults::UP_NEXT_COUNT,
            max_hold_attempts: defaults::MAX_HOLD_ATTEMPTS,
            allow_duplicates: false,
        }
    }
}

/// Complete server-reported queue state at one instant.
///
/// Never partially merged: each fetch or received broadcast replaces the
/// whole state or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Server wall-clock time at snapshot creation.
    pub server_time: DateTime<Utc>,
    /// Service-day key (e.g. `"2026-08-07"`); queue numbers reset per day.
    pub date_key: String,
    pub settings: QueueSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_serving: Option<TicketView>,
    pub waiting: Vec<TicketView>,
    pub hold: Vec<TicketView>,
    pub called: Vec<TicketView>,
    pub up_next: Vec<TicketView>,
}

impl QueueState {
    /// Union of tickets in active statuses (waiting/hold/called), the
    /// population the duplicate detector scans.
    pub fn active_tickets(&self) -> impl Iterator<Item = &TicketView> {
        self.waiting
            .iter()
            .chain(self.hold.iter())
            .chain(self.called.iter())
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A timestamped copy of queue state scoped to one window/department.
///
/// Only one current snapshot is retained per tab. A newer snapshot (by
/// `timestamp`) always replaces an older one regardless of arrival order;
/// replays and duplicates are safe no-ops once a newer one has applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Scope partition this snapshot belongs to (see [`Scope::key`]).
    pub scope_key: String,
    /// Coordination timestamp in epoch milliseconds, minted by the fetching
    /// tab's clock at fetch completion.
    pub timestamp: i64,
    pub state: QueueState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(name: &str) -> Department {
        Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: name[..1].to_uppercase(),
        }
    }

    fn ticket(number: u32, status: TicketStatus) -> TicketView {
        TicketView {
            id: format!("t-{number}"),
            queue_number: number,
            status,
            department: dept("Registrar"),
            participant: None,
            window: None,
            called_at: None,
            served_at: None,
            out_at: None,
            hold_attempts: 0,
        }
    }

    #[test]
    fn scope_keys_partition_by_kind() {
        let id = Uuid::new_v4();
        assert_ne!(Scope::Window(id).key(), Scope::Department(id).key());
        assert!(Scope::Window(id).key().starts_with("window:"));
    }

    #[test]
    fn active_tickets_unions_three_lists() {
        let state = QueueState {
            server_time: Utc::now(),
            date_key: "2026-08-07".to_string(),
            settings: QueueSettings::default(),
            now_serving: Some(ticket(1, TicketStatus::Serving)),
            waiting: vec![ticket(2, TicketStatus::Waiting)],
            hold: vec![ticket(3, TicketStatus::Hold)],
            called: vec![ticket(4, TicketStatus::Called)],
            up_next: vec![ticket(2, TicketStatus::Waiting)],
        };
        let numbers: Vec<u32> = state.active_tickets().map(|t| t.queue_number).collect();
        // now_serving and up_next are not part of the active union
        assert_eq!(numbers, vec![2, 3, 4]);
    }

    #[test]
    fn ticket_view_roundtrips_without_optional_fields() {
        let t = ticket(7, TicketStatus::Waiting);
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("window"));
        assert!(!json.contains("called_at"));
        let back: TicketView = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
