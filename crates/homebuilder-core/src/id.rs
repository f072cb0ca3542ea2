use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle of a component (walls included) within one World.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(u64);

/// Opaque handle of a Level within one World.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(u64);

impl ComponentId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl LevelId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component_{}", self.0)
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level_{}", self.0)
    }
}

/// The id sequence ran past `u64::MAX`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("id sequence exhausted after {0}")]
pub struct IdExhausted(pub u64);

/// Hands out ids from one monotonically increasing sequence shared by
/// levels and components. Ids are never handed out twice, even after the
/// entity they named has been undone.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// A sequence whose first id is `next`.
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn next_component(&mut self) -> Result<ComponentId, IdExhausted> {
        self.bump().map(ComponentId)
    }

    pub fn next_level(&mut self) -> Result<LevelId, IdExhausted> {
        self.bump().map(LevelId)
    }

    /// Record an id that arrived from outside (command replay) so the
    /// sequence never hands it out again. The sequence is left unchanged
    /// when no id could follow `raw`.
    pub fn observe(&mut self, raw: u64) -> Result<(), IdExhausted> {
        let after = raw.checked_add(1).ok_or(IdExhausted(raw))?;
        self.next = self.next.max(after);
        Ok(())
    }

    pub fn peek(&self) -> u64 {
        self.next
    }

    fn bump(&mut self) -> Result<u64, IdExhausted> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or(IdExhausted(id))?;
        Ok(id)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
