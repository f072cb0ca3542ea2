use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BoundingRect, Point2};
use crate::id::ComponentId;

/// An entry in the R-tree spatial index, referencing a wall by id.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialEntry {
    pub wall: ComponentId,
    /// Bounding rectangle of the wall's footprint.
    pub bounds: BoundingRect,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// Broad-phase index over footprint bounding rectangles of one level.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex").field("len", &self.len()).finish()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index from a list of footprint bounds.
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// All entries whose bounds contain the given point (boundary included).
    pub fn query_point(&self, point: &Point2) -> Vec<&SpatialEntry> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .collect()
    }

    /// All entries whose bounds intersect `rect` (touching included).
    pub fn query_rect(&self, rect: &BoundingRect) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
