//! # HomeBuilder Collide
//!
//! Collision checks for wall footprints.
//! Candidate placements are checked against the flushed footprints of one
//! level: an R-tree broad phase, a separating axis pre-reject for convex
//! outlines, then an exact edge crossing test. Capsules around centerlines
//! give a cheaper proximity check.

pub mod capsule;
pub mod checker;
pub mod collision;
pub mod polygon;

pub use capsule::{capsules_intersect, segment_distance};
pub use checker::CollisionChecker;
pub use collision::{Collision, CollisionKind, Placement, WallPair};
pub use polygon::{convex_polygons_intersect, edge_hits, polygons_intersect, polygons_intersect_with, EdgeHit};
