//! Error types for qdesk.

use thiserror::Error;

/// Result type alias using qdesk's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for qdesk operations.
///
/// No variant here is fatal to the console: every failure path has a
/// degraded-but-functional fallback (assumed leadership when the store is
/// unavailable, silent retry on transient fetch errors, disabled audio
/// toggle when speech is missing). The server remains the source of truth
/// for all ticket business logic.
#[derive(Error, Debug)]
pub enum Error {
    /// Shared key-value store is unavailable or rejected an operation
    /// (e.g. storage disabled in private browsing).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cross-tab transport failed to publish or deliver.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Queue-service request failed (network/server). Retried on the next
    /// poll tick; surfaced to the user at most once per throttle window.
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Speech synthesis is not available on this device.
    #[error("Speech synthesis unavailable")]
    SpeechUnavailable,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
