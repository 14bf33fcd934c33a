//! Stable entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable entity identifier that persists across save/load cycles.
///
/// Identifiers are allocated per scene by an [`EntityIdAllocator`] and are
/// never zero. The raw value 0 is reserved as "no entity".
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The reserved null identifier
    pub const NONE: Self = Self(0);

    /// Create an EntityId from a raw value (for deserialization/testing)
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Whether this identifier refers to an entity at all
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic per-scene identifier source.
///
/// Identifiers are never reused. Once `u32::MAX` has been handed out the
/// allocator is exhausted and only yields [`EntityId::NONE`].
#[derive(Debug, Clone)]
pub struct EntityIdAllocator {
    next: u64,
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next identifier, or [`EntityId::NONE`] when exhausted
    pub fn allocate(&mut self) -> EntityId {
        let id = self.peek();
        if id.is_valid() {
            self.next += 1;
        } else {
            log::error!("Entity id space exhausted; no further ids will be issued");
        }
        id
    }

    /// Set the counter to at least one past the given id (for loading scenes)
    pub fn ensure_above(&mut self, id: EntityId) {
        let above = u64::from(id.0) + 1;
        if above > self.next {
            self.next = above;
        }
    }

    /// The value the next allocation will return
    pub fn peek(&self) -> EntityId {
        u32::try_from(self.next).map_or(EntityId::NONE, EntityId)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next > u64::from(u32::MAX)
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}
