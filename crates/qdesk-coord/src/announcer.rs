//! Announcement deduplication and utterance composition.
//!
//! Every tab observes the now-serving ticket of each applied snapshot and
//! marks it as seen; only the tab holding "speaker" leadership actually
//! invokes speech synthesis. The seen-set is deliberately volatile and
//! per-tab: when speaker leadership transfers to a tab with an empty
//! memory, the ticket currently shown as now-serving may be re-announced
//! exactly once, which is an accepted tradeoff of the handover.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use qdesk_core::{CoordEvent, EventBus, SpeechSynthesizer, TicketView};

/// Decides, per ticket, whether to trigger speech synthesis, ensuring each
/// ticket is announced at most once per tab lifetime.
pub struct Announcer {
    seen: HashSet<String>,
    /// Last announced queue number and utterance, kept for recall.
    last_announced: Option<(u32, String)>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    bus: Arc<EventBus>,
    unavailable_notified: bool,
}

impl Announcer {
    pub fn new(speech: Option<Arc<dyn SpeechSynthesizer>>, bus: Arc<EventBus>) -> Self {
        Self {
            seen: HashSet::new(),
            last_announced: None,
            speech,
            bus,
            unavailable_notified: false,
        }
    }

    /// Whether speech synthesis exists on this device. Absence disables
    /// only the audio toggle, nothing else.
    pub fn speech_available(&self) -> bool {
        self.speech.is_some()
    }

    /// True the first time a ticket id is asked about, false on every
    /// subsequent ask within this tab's lifetime — even if the identical
    /// snapshot is redelivered.
    pub fn should_announce(&mut self, ticket_id: &str) -> bool {
        self.seen.insert(ticket_id.to_string())
    }

    /// Assemble the utterance: queue number, department name, window
    /// number, participant name — each included only if non-empty, joined
    /// with single spaces. Identical composition on every tab, so a
    /// leadership handoff produces consistent wording.
    pub fn compose(ticket: &TicketView) -> String {
        let mut parts: Vec<String> = vec![ticket.queue_number.to_string()];
        if !ticket.department.name.is_empty() {
            parts.push(ticket.department.name.clone());
        }
        if let Some(window) = &ticket.window {
            parts.push(window.number.to_string());
        }
        if let Some(participant) = &ticket.participant {
            if !participant.name.is_empty() {
                parts.push(participant.name.clone());
            }
        }
        parts.join(" ")
    }

    /// Observe a now-serving ticket from a freshly applied snapshot.
    ///
    /// The ticket is marked seen on every tab; speech fires only when the
    /// ticket is new to this tab *and* the caller holds speaker leadership
    /// with audio enabled (`may_speak`). Returns true if speech fired.
    pub fn observe(&mut self, ticket: &TicketView, may_speak: bool) -> bool {
        let first_time = self.should_announce(&ticket.id);
        if !first_time || !may_speak {
            return false;
        }
        let utterance = Self::compose(ticket);
        self.last_announced = Some((ticket.queue_number, utterance.clone()));
        self.speak(ticket.queue_number, &utterance)
    }

    /// Re-speak the last announced utterance, bypassing deduplication.
    pub fn recall(&mut self) -> bool {
        match self.last_announced.clone() {
            Some((queue_number, utterance)) => self.speak(queue_number, &utterance),
            None => false,
        }
    }

    /// Queue number of the last announcement, if any.
    pub fn last_queue_number(&self) -> Option<u32> {
        self.last_announced.as_ref().map(|(n, _)| *n)
    }

    fn speak(&mut self, queue_number: u32, utterance: &str) -> bool {
        let Some(speech) = &self.speech else {
            // Inform once, not on every attempt.
            if !self.unavailable_notified {
                self.unavailable_notified = true;
                warn!("speech synthesis unavailable, audio disabled");
                self.bus.emit(CoordEvent::SpeechUnavailable);
            }
            return false;
        };
        match speech.speak(utterance) {
            Ok(()) => {
                debug!(queue_number, utterance, "announced");
                self.bus.emit(CoordEvent::Announced {
                    queue_number,
                    utterance: utterance.to_string(),
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "speech synthesis failed");
                false
            }
        }
    }
}
