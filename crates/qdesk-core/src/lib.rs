//! # qdesk-core
//!
//! Core types, traits, and abstractions for the qdesk queue console.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the coordination layer and backends depend on: queue
//! state models, the shared-store / queue-service / speech seams, the
//! injectable clock, and the coordination event bus.

pub mod clock;
pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use events::{CoordEvent, EventBus};
pub use models::{
    Department, Participant, QueueSettings, QueueState, Scope, ServiceWindow, Snapshot,
    TicketStatus, TicketView,
};
pub use traits::{
    MemoryStore, QueueService, SharedStore, SpeechSynthesizer, StoreChange, UnavailableStore,
};
