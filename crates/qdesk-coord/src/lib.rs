//! # qdesk-coord
//!
//! Multi-tab live-state coordination for the qdesk queue console.
//!
//! Several browser tabs (or processes) of one staff origin poll a shared
//! queue server but must behave as a single coordinated client. This crate
//! provides:
//! - TTL-lease leadership so only one tab polls and only one tab speaks
//! - a drift-free poll scheduler with visibility gating and UI countdown
//! - cross-tab snapshot transport (broadcast channel with storage fallback)
//!   with timestamp-monotonic, scope-filtered application
//! - at-most-once ticket announcements with consistent utterance wording
//! - persisted action cooldowns and duplicate-ticket diagnostics
//!
//! Coordination is deliberately liveness-favored: the underlying
//! primitives have no compare-and-swap, leases are eventually (not
//! instantaneously) exclusive, and every failure path degrades to a
//! functional single-tab behavior. The server stays authoritative for all
//! ticket business logic.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qdesk_coord::{SessionConfig, TabSession};
//! use qdesk_coord::transport::{detect_transport, ChannelTransport};
//! use qdesk_core::{MemoryStore, Scope, SystemClock};
//!
//! let store = Arc::new(MemoryStore::new());
//! let transport = detect_transport(Some(ChannelTransport::default()), store.clone());
//! let session = TabSession::new(
//!     Scope::Window(window_id),
//!     SessionConfig::from_env(),
//!     Arc::new(SystemClock),
//!     queue_service,
//!     store,
//!     transport,
//!     None,
//! );
//! let handle = session.start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! handle.shutdown().await;
//! ```

pub mod announcer;
pub mod cooldown;
pub mod duplicates;
pub mod identity;
pub mod lease;
pub mod scheduler;
pub mod session;
pub mod throttle;
pub mod transport;

// Re-export core types
pub use qdesk_core::*;

pub use announcer::Announcer;
pub use cooldown::CooldownGuard;
pub use duplicates::{DuplicateDetector, DuplicateGroup, DuplicateReport};
pub use identity::TabId;
pub use lease::{LeaseHandle, LeaseManager, LeaseRecord};
pub use scheduler::{PollScheduler, SchedulerState};
pub use session::{SessionConfig, SessionHandle, TabSession};
pub use throttle::Throttle;
pub use transport::{
    detect_transport, ChannelTransport, SnapshotGate, SnapshotTransport, StoreTransport,
};
