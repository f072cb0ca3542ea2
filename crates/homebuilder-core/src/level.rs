use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::Direction;
use crate::id::{ComponentId, LevelId};
use crate::snap::{alignment_intersections, snap_directions, Alignment, AlignmentKey};
use crate::spatial::SpatialIndex;
use crate::wall::Wall;

/// One floor of the plan: a horizontal plane holding components at a
/// fixed height, with its own snap directions, alignment cache and
/// pending footprint rebuilds.
#[derive(Debug)]
pub struct Level {
    id: LevelId,
    y: f64,
    components: BTreeSet<ComponentId>,
    walls: BTreeSet<ComponentId>,
    snap_directions: Vec<Direction>,
    alignments: BTreeMap<AlignmentKey, Alignment>,
    needing_rebuild: BTreeSet<ComponentId>,
    spatial: SpatialIndex,
}

impl Level {
    pub(crate) fn new(id: LevelId, y: f64) -> Self {
        Self {
            id,
            y,
            components: BTreeSet::new(),
            walls: BTreeSet::new(),
            snap_directions: snap_directions([]),
            alignments: BTreeMap::new(),
            needing_rebuild: BTreeSet::new(),
            spatial: SpatialIndex::new(),
        }
    }

    pub fn id(&self) -> LevelId {
        self.id
    }

    /// Height of the floor plane.
    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().copied()
    }

    pub fn wall_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.walls.iter().copied()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains(&id)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn snap_directions(&self) -> &[Direction] {
        &self.snap_directions
    }

    pub fn alignments(&self) -> &BTreeMap<AlignmentKey, Alignment> {
        &self.alignments
    }

    /// Index over the current footprint bounds. Valid after a flush.
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn needs_rebuild(&self) -> bool {
        !self.needing_rebuild.is_empty()
    }

    pub fn pending_rebuilds(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.needing_rebuild.iter().copied()
    }

    // ── Mutation (through Plan only) ─────────────────────────────────

    pub(crate) fn add_wall(&mut self, id: ComponentId) {
        self.components.insert(id);
        self.walls.insert(id);
    }

    pub(crate) fn remove_wall(&mut self, id: ComponentId) {
        self.components.remove(&id);
        self.walls.remove(&id);
        self.needing_rebuild.remove(&id);
    }

    /// Returns false when the wall was already waiting for a rebuild.
    pub(crate) fn mark_dirty(&mut self, id: ComponentId) -> bool {
        self.needing_rebuild.insert(id)
    }

    pub(crate) fn take_dirty(&mut self) -> BTreeSet<ComponentId> {
        std::mem::take(&mut self.needing_rebuild)
    }

    pub(crate) fn refresh_snaps(&mut self, walls: &[&Wall]) {
        self.snap_directions = snap_directions(walls.iter().copied());
        self.alignments = alignment_intersections(walls, &self.snap_directions);
    }

    pub(crate) fn set_spatial(&mut self, spatial: SpatialIndex) {
        self.spatial = spatial;
    }
}
