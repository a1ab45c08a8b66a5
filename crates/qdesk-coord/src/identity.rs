//! Tab identity.

use std::fmt;

use uuid::Uuid;

/// Opaque identifier generated once per tab/process lifetime.
///
/// Never persisted; its only job is to serve as the holder value in lease
/// records, so a tab can recognize its own claims. A reloaded tab gets a
/// fresh identity and simply re-claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_unique_per_generation() {
        assert_ne!(TabId::generate(), TabId::generate());
    }
}
