//! ID types for units and transient combat resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unit IDs.
static UNIT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a combat-capable unit.
///
/// The decision core never owns the unit behind the handle; it only reads
/// accessor results and calls mutators through collaborator traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u64);

impl UnitId {
    /// Creates a new unique unit ID.
    #[must_use]
    pub fn new() -> Self {
        Self(UNIT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a unit ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid unit ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) unit ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Handle to a hitbox opened by the combat collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitboxId(u64);

impl HitboxId {
    /// Creates a hitbox ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}
