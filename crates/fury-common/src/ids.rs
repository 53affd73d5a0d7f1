//! Stable entity handles.
//!
//! Handles are handed out by a [`HandleGenerator`] owned by the simulation, so
//! two worlds built from the same inputs assign the same handles. A handle is
//! never reused and never encodes an array position.

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Null/invalid entity handle.
    pub const NULL: Self = Self(0);

    /// Creates an entity handle from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid (non-null) entity handle.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic handle counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleGenerator {
    next: u64,
}

impl HandleGenerator {
    /// Creates a generator whose first handle is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns a fresh handle.
    pub fn generate(&mut self) -> EntityHandle {
        let handle = EntityHandle(self.next);
        self.next += 1;
        handle
    }

    /// Number of handles issued so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self::new()
    }
}
