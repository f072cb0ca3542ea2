use serde::Serialize;

use homebuilder_core::id::ComponentId;

use crate::polygon::EdgeHit;

/// How a collision was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollisionKind {
    /// Footprint outlines cross.
    Outline,
    /// Capsules around the centerlines overlap.
    Capsule,
}

/// A single collision between a checked footprint and an existing wall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collision {
    /// The existing wall that was hit.
    pub wall: ComponentId,
    pub kind: CollisionKind,
    /// Region of the collision: [min_x, min_y, max_x, max_y]
    pub bbox: [f64; 4],
    /// Edge crossings; empty for capsule hits.
    pub hits: Vec<EdgeHit>,
}

/// Verdict on a candidate wall placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Placement {
    Valid,
    /// Shorter than the minimum wall length.
    TooShort { length: f64 },
    /// An endpoint lies outside the editable area.
    OutOfBounds,
    Collides(Vec<Collision>),
}

impl Placement {
    pub fn is_valid(&self) -> bool {
        matches!(self, Placement::Valid)
    }
}

/// A collision between two existing walls, reported once per pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallPair {
    pub first: ComponentId,
    pub collision: Collision,
}
