//! Duplicate active-ticket detection.
//!
//! Two active tickets sharing a (department, queue number) pair are
//! structurally impossible on a healthy server day, so the console flags
//! them. Purely diagnostic: the detector never mutates, merges, or
//! resolves tickets, and its warning never blocks any action.

use uuid::Uuid;

use qdesk_core::QueueState;

/// One group of active tickets sharing a (department, queue number) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub department_id: Uuid,
    pub queue_number: u32,
    pub ticket_ids: Vec<String>,
}

/// Result of scanning one snapshot.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    /// True only on a clean→dirty transition with warnings enabled by
    /// policy; the caller surfaces exactly one operator warning per dirty
    /// period.
    pub warn: bool,
}

/// Scans snapshots for duplicate active tickets with edge-triggered
/// warning suppression: one warning on clean→dirty, re-armed only after a
/// fully duplicate-free scan.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    dirty: bool,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group waiting/hold/called tickets by (department id, queue number)
    /// and report groups of size > 1.
    pub fn scan(&mut self, state: &QueueState) -> DuplicateReport {
        let mut by_key: Vec<((Uuid, u32), Vec<String>)> = Vec::new();
        for ticket in state.active_tickets() {
            let key = (ticket.department.id, ticket.queue_number);
            match by_key.iter_mut().find(|(k, _)| *k == key) {
                Some((_, ids)) => ids.push(ticket.id.clone()),
                None => by_key.push((key, vec![ticket.id.clone()])),
            }
        }

        let groups: Vec<DuplicateGroup> = by_key
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|((department_id, queue_number), ticket_ids)| DuplicateGroup {
                department_id,
                queue_number,
                ticket_ids,
            })
            .collect();

        let has_duplicates = !groups.is_empty();
        let warn = has_duplicates && !self.dirty && !state.settings.allow_duplicates;
        self.dirty = has_duplicates;

        DuplicateReport { groups, warn }
    }
}
