use std::collections::BTreeMap;

use thiserror::Error;

use crate::footprint::WallFootprint;
use crate::geometry::Point;
use crate::id::{ComponentId, IdAllocator, IdExhausted, LevelId};
use crate::level::Level;
use crate::shapes::ParallelLines;
use crate::snap::{find_snap_points, SnapCandidate, SnapQuery};
use crate::spatial::{SpatialEntry, SpatialIndex};
use crate::wall::{Wall, WallError};

/// Lookup and identity failures inside the plan store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("unknown level {0}")]
    UnknownLevel(LevelId),

    #[error("unknown wall {0}")]
    UnknownWall(ComponentId),

    #[error("id {0} is already in use")]
    DuplicateId(u64),

    #[error("level {0} still holds {1} components")]
    LevelNotEmpty(LevelId, usize),

    #[error(transparent)]
    IdExhausted(#[from] IdExhausted),

    #[error(transparent)]
    Wall(#[from] WallError),
}

/// The arena holding every level and every wall, keyed by id.
///
/// Walls and levels refer to each other only through ids; all mutation goes
/// through the `pub(crate)` methods that command handlers call.
#[derive(Debug)]
pub struct Plan {
    ids: IdAllocator,
    levels: BTreeMap<LevelId, Level>,
    walls: BTreeMap<ComponentId, Wall>,
    active_level: LevelId,
}

impl Plan {
    /// An empty plan with a single ground level at height 0.
    pub fn new() -> Self {
        let ground = LevelId::from_raw(1);
        let ids = IdAllocator::starting_at(ground.raw() + 1);
        let mut levels = BTreeMap::new();
        levels.insert(ground, Level::new(ground, 0.0));
        Self {
            ids,
            levels,
            walls: BTreeMap::new(),
            active_level: ground,
        }
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn allocate_component_id(&mut self) -> Result<ComponentId, PlanError> {
        Ok(self.ids.next_component()?)
    }

    pub fn allocate_level_id(&mut self) -> Result<LevelId, PlanError> {
        Ok(self.ids.next_level()?)
    }

    /// Keep an id that arrived from a replayed command out of the sequence.
    pub fn observe_id(&mut self, raw: u64) -> Result<(), PlanError> {
        Ok(self.ids.observe(raw)?)
    }

    fn is_in_use(&self, raw: u64) -> bool {
        self.walls.contains_key(&ComponentId::from_raw(raw)) || self.levels.contains_key(&LevelId::from_raw(raw))
    }

    // ── Levels ───────────────────────────────────────────────────────

    pub fn active_level(&self) -> LevelId {
        self.active_level
    }

    pub fn set_active_level(&mut self, id: LevelId) -> Result<(), PlanError> {
        if !self.levels.contains_key(&id) {
            return Err(PlanError::UnknownLevel(id));
        }
        self.active_level = id;
        Ok(())
    }

    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(&id)
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn create_level(&mut self, id: LevelId, y: f64) -> Result<(), PlanError> {
        if self.is_in_use(id.raw()) {
            return Err(PlanError::DuplicateId(id.raw()));
        }
        self.ids.observe(id.raw())?;
        self.levels.insert(id, Level::new(id, y));
        Ok(())
    }

    pub(crate) fn remove_level(&mut self, id: LevelId) -> Result<Level, PlanError> {
        let level = self.levels.get(&id).ok_or(PlanError::UnknownLevel(id))?;
        if level.component_count() > 0 {
            return Err(PlanError::LevelNotEmpty(id, level.component_count()));
        }
        if self.active_level == id {
            if let Some(other) = self.levels.keys().copied().find(|other| *other != id) {
                self.active_level = other;
            }
        }
        self.levels.remove(&id).ok_or(PlanError::UnknownLevel(id))
    }

    // ── Walls ────────────────────────────────────────────────────────

    pub fn wall(&self, id: ComponentId) -> Option<&Wall> {
        self.walls.get(&id)
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.walls.values()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    /// All walls of one level in id order. Empty for an unknown level.
    pub fn walls_on(&self, level: LevelId) -> impl Iterator<Item = &Wall> {
        self.levels
            .get(&level)
            .into_iter()
            .flat_map(|level| level.wall_ids())
            .filter_map(|id| self.walls.get(&id))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_wall(
        &mut self,
        id: ComponentId,
        level: LevelId,
        start: Point,
        end: Point,
        angle: Option<u16>,
        width: f64,
        height: f64,
    ) -> Result<&Wall, PlanError> {
        if !self.levels.contains_key(&level) {
            return Err(PlanError::UnknownLevel(level));
        }
        if self.is_in_use(id.raw()) {
            return Err(PlanError::DuplicateId(id.raw()));
        }
        let wall = Wall::new(id, level, start, end, angle, width, height)?;
        self.ids.observe(id.raw())?;
        self.walls.insert(id, wall);
        if let Some(level) = self.levels.get_mut(&level) {
            level.add_wall(id);
        }
        self.update_walls(level, &[start, end]);
        self.walls.get(&id).ok_or(PlanError::UnknownWall(id))
    }

    pub(crate) fn destroy_wall(&mut self, id: ComponentId) -> Result<Wall, PlanError> {
        let wall = self.walls.remove(&id).ok_or(PlanError::UnknownWall(id))?;
        if let Some(level) = self.levels.get_mut(&wall.level()) {
            level.remove_wall(id);
        }
        self.update_walls(wall.level(), &[wall.start(), wall.end()]);
        Ok(wall)
    }

    /// Move both ends of a wall. Returns the previous ends.
    pub(crate) fn set_wall(&mut self, id: ComponentId, start: Point, end: Point) -> Result<(Point, Point), PlanError> {
        let wall = self.walls.get_mut(&id).ok_or(PlanError::UnknownWall(id))?;
        let (old_start, old_end) = wall.set(start, end)?;
        let level = wall.level();
        self.update_walls(level, &[old_start, old_end, start, end]);
        Ok((old_start, old_end))
    }

    /// Refresh the level's snap caches after a geometry change and queue a
    /// footprint rebuild for every wall touching one of `points`.
    pub(crate) fn update_walls(&mut self, level: LevelId, points: &[Point]) {
        let Some(level) = self.levels.get_mut(&level) else {
            return;
        };
        let walls: Vec<&Wall> = level.wall_ids().filter_map(|id| self.walls.get(&id)).collect();
        level.refresh_snaps(&walls);
        for wall in walls {
            if points.iter().any(|p| wall.has_endpoint(p)) {
                level.mark_dirty(wall.id());
            }
        }
    }

    // ── Rebuilds ─────────────────────────────────────────────────────

    /// Queue a footprint rebuild without changing any geometry.
    pub fn mark_dirty(&mut self, id: ComponentId) -> Result<(), PlanError> {
        let wall = self.walls.get(&id).ok_or(PlanError::UnknownWall(id))?;
        let level = self.levels.get_mut(&wall.level()).ok_or(PlanError::UnknownLevel(wall.level()))?;
        level.mark_dirty(id);
        Ok(())
    }

    pub fn needs_flush(&self) -> bool {
        self.levels.values().any(Level::needs_rebuild)
    }

    /// Rebuild every queued footprint, then refresh the spatial index of
    /// each touched level. Returns the number of footprints rebuilt.
    ///
    /// Corners are resolved from centerlines and face lines only, so all
    /// outlines of a level are computed before any of them is stored.
    pub fn flush(&mut self) -> usize {
        let mut rebuilt = 0;
        for level in self.levels.values_mut() {
            let dirty = level.take_dirty();
            if dirty.is_empty() {
                continue;
            }
            let neighbours: Vec<&Wall> = level.wall_ids().filter_map(|id| self.walls.get(&id)).collect();
            let footprints: Vec<(ComponentId, WallFootprint)> = dirty
                .iter()
                .filter_map(|id| self.walls.get(id))
                .map(|wall| {
                    let footprint = WallFootprint::resolve(Some(wall.id()), wall.lines(), neighbours.iter().copied());
                    (wall.id(), footprint)
                })
                .collect();

            let count = footprints.len();
            for (id, footprint) in footprints {
                if let Some(wall) = self.walls.get_mut(&id) {
                    debug_assert!(footprint.polygon().is_closed());
                    wall.set_footprint(footprint);
                }
            }

            let entries = level
                .wall_ids()
                .filter_map(|id| self.walls.get(&id))
                .filter_map(|wall| {
                    wall.footprint().map(|footprint| SpatialEntry {
                        wall: wall.id(),
                        bounds: *footprint.bounds(),
                    })
                })
                .collect();
            level.set_spatial(SpatialIndex::build(entries));
            log::debug!("rebuilt {} footprints on {}", count, level.id());
            rebuilt += count;
        }
        rebuilt
    }

    // ── Placement helpers ────────────────────────────────────────────

    /// Outline a wall that does not exist yet, mitred against the level.
    pub fn speculative_footprint(
        &self,
        level: LevelId,
        start: Point,
        end: Point,
        width: f64,
    ) -> Result<WallFootprint, PlanError> {
        if !self.levels.contains_key(&level) {
            return Err(PlanError::UnknownLevel(level));
        }
        let lines = ParallelLines::new(start, end, width, None)?;
        Ok(WallFootprint::resolve(None, &lines, self.walls_on(level)))
    }

    /// Snap candidates for a cursor position on one level.
    pub fn find_snap_points(&self, level: LevelId, query: &SnapQuery) -> Result<Vec<SnapCandidate>, PlanError> {
        let directions = self.levels.get(&level).ok_or(PlanError::UnknownLevel(level))?.snap_directions();
        let walls: Vec<&Wall> = self.walls_on(level).collect();
        Ok(find_snap_points(&walls, directions, query))
    }

    /// Walls whose flushed footprint contains `point`, for picking.
    pub fn walls_at(&self, level: LevelId, point: &Point) -> Result<Vec<ComponentId>, PlanError> {
        let level = self.levels.get(&level).ok_or(PlanError::UnknownLevel(level))?;
        let floor = point.floor();
        let mut hits: Vec<ComponentId> = level
            .spatial()
            .query_point(&floor)
            .into_iter()
            .filter(|entry| {
                self.walls
                    .get(&entry.wall)
                    .and_then(Wall::footprint)
                    .is_some_and(|footprint| footprint.polygon().contains_point(&floor))
            })
            .map(|entry| entry.wall)
            .collect();
        hits.sort();
        Ok(hits)
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapKind;
    use approx::assert_relative_eq;

    fn ground(plan: &Plan) -> LevelId {
        plan.active_level()
    }

    fn add_wall(plan: &mut Plan, start: (f64, f64), end: (f64, f64)) -> ComponentId {
        let id = plan.allocate_component_id().unwrap();
        let level = ground(plan);
        plan.create_wall(
            id,
            level,
            Point::new(start.0, 0.0, start.1),
            Point::new(end.0, 0.0, end.1),
            None,
            0.4,
            2.4,
        )
        .unwrap();
        id
    }

    #[test]
    fn test_new_plan_has_ground_level() {
        let plan = Plan::new();
        assert_eq!(plan.level_count(), 1);
        assert_eq!(plan.active_level(), LevelId::from_raw(1));
        assert_eq!(plan.ids().peek(), 2);
    }

    #[test]
    fn test_create_wall_queues_rebuild() {
        let mut plan = Plan::new();
        let id = add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        assert!(plan.needs_flush());
        assert!(plan.wall(id).unwrap().footprint().is_none());
        assert_eq!(plan.flush(), 1);
        assert!(!plan.needs_flush());
        assert!(plan.wall(id).unwrap().footprint().is_some());
        assert_eq!(plan.level(ground(&plan)).unwrap().spatial().len(), 1);
    }

    #[test]
    fn test_neighbour_rebuilt_when_corner_appears() {
        let mut plan = Plan::new();
        let first = add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        plan.flush();
        let second = add_wall(&mut plan, (4.0, 0.0), (4.0, 4.0));
        let pending: Vec<ComponentId> = plan.level(ground(&plan)).unwrap().pending_rebuilds().collect();
        assert_eq!(pending, vec![first, second]);
        assert_eq!(plan.flush(), 2);

        let outline = plan.wall(first).unwrap().footprint().unwrap().polygon();
        assert_relative_eq!(outline.vertices()[2].x, 4.2, epsilon = 1e-9);
        assert_relative_eq!(outline.vertices()[2].y, -0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut plan = Plan::new();
        let id = add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        let level = ground(&plan);
        let again = plan.create_wall(id, level, Point::new(0.0, 0.0, 1.0), Point::new(1.0, 0.0, 1.0), None, 0.4, 2.4);
        assert_eq!(again.unwrap_err(), PlanError::DuplicateId(id.raw()));
        assert_eq!(plan.create_level(level, 3.0), Err(PlanError::DuplicateId(level.raw())));
    }

    #[test]
    fn test_replayed_ids_are_observed() {
        let mut plan = Plan::new();
        let level = ground(&plan);
        plan.create_wall(
            ComponentId::from_raw(40),
            level,
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            None,
            0.4,
            2.4,
        )
        .unwrap();
        assert_eq!(plan.allocate_component_id().unwrap(), ComponentId::from_raw(41));
    }

    #[test]
    fn test_last_id_cannot_be_stored() {
        let mut plan = Plan::new();
        let level = ground(&plan);
        let last = ComponentId::from_raw(u64::MAX);
        let created = plan.create_wall(last, level, Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), None, 0.4, 2.4);
        assert_eq!(created.unwrap_err(), PlanError::IdExhausted(IdExhausted(u64::MAX)));
        assert!(plan.wall(last).is_none());
        assert_eq!(plan.ids().peek(), 2);
    }

    #[test]
    fn test_destroy_wall_dirties_neighbours() {
        let mut plan = Plan::new();
        let first = add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        let second = add_wall(&mut plan, (4.0, 0.0), (4.0, 4.0));
        plan.flush();
        let removed = plan.destroy_wall(second).unwrap();
        assert_eq!(removed.id(), second);
        let pending: Vec<ComponentId> = plan.level(ground(&plan)).unwrap().pending_rebuilds().collect();
        assert_eq!(pending, vec![first]);
        plan.flush();
        // back to the plain offset corner
        let outline = plan.wall(first).unwrap().footprint().unwrap().polygon();
        assert_relative_eq!(outline.vertices()[2].x, 4.0, epsilon = 1e-9);
        assert!(plan.destroy_wall(second).is_err());
    }

    #[test]
    fn test_set_wall_keeps_angle_within_tolerance() {
        let mut plan = Plan::new();
        let id = add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        let moved = plan.set_wall(id, Point::new(0.0, 0.0, 1.0), Point::new(4.0, 0.0, 1.0));
        assert_eq!(moved.unwrap(), (Point::new(0.0, 0.0, 0.0), Point::new(4.0, 0.0, 0.0)));
        let skewed = plan.set_wall(id, Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 4.0));
        assert!(matches!(skewed, Err(PlanError::Wall(WallError::AngleDrift { .. }))));
        // the failed move leaves the wall untouched
        assert_eq!(plan.wall(id).unwrap().start(), Point::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_remove_level_requires_empty() {
        let mut plan = Plan::new();
        let upper = plan.allocate_level_id().unwrap();
        plan.create_level(upper, 3.0).unwrap();
        let id = plan.allocate_component_id().unwrap();
        plan.create_wall(id, upper, Point::new(0.0, 3.0, 0.0), Point::new(2.0, 3.0, 0.0), None, 0.4, 2.4)
            .unwrap();
        assert_eq!(plan.remove_level(upper).unwrap_err(), PlanError::LevelNotEmpty(upper, 1));
        plan.destroy_wall(id).unwrap();
        assert_eq!(plan.remove_level(upper).unwrap().y(), 3.0);
    }

    #[test]
    fn test_speculative_footprint_does_not_touch_plan() {
        let mut plan = Plan::new();
        add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        plan.flush();
        let level = ground(&plan);
        let footprint = plan
            .speculative_footprint(level, Point::new(4.0, 0.0, 0.0), Point::new(4.0, 0.0, 4.0), 0.4)
            .unwrap();
        assert!(footprint.owner().is_none());
        assert_eq!(plan.wall_count(), 1);
        assert!(!plan.needs_flush());
    }

    #[test]
    fn test_snap_points_through_plan() {
        let mut plan = Plan::new();
        add_wall(&mut plan, (0.0, 0.0), (4.0, 0.0));
        let query = SnapQuery {
            point: Point::new(3.9, 0.0, 0.1),
            anchor: None,
            threshold: 0.3,
            grid_step: 0.1,
        };
        let found = plan.find_snap_points(ground(&plan), &query).unwrap();
        assert_eq!(found.last().unwrap().kind, SnapKind::WallEnd);
        assert!(plan.find_snap_points(LevelId::from_raw(99), &query).is_err());
    }

    #[test]
    fn test_walls_at_picks_by_footprint() {
        let mut plan = Plan::new();
        let a = add_wall(&mut plan, (0.0, 0.0), (4.0, 4.0));
        let b = add_wall(&mut plan, (0.0, 4.0), (4.0, 0.0));
        let level = ground(&plan);
        // nothing is indexed before the first flush
        assert!(plan.walls_at(level, &Point::new(1.0, 0.0, 1.0)).unwrap().is_empty());
        plan.flush();
        assert_eq!(plan.walls_at(level, &Point::new(1.0, 0.0, 1.0)).unwrap(), vec![a]);
        assert_eq!(plan.walls_at(level, &Point::new(2.0, 0.0, 2.0)).unwrap(), vec![a, b]);
        // inside both bounding boxes, outside both outlines
        assert!(plan.walls_at(level, &Point::new(2.0, 0.0, 0.5)).unwrap().is_empty());
    }
}
