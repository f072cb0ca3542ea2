use homebuilder_core::footprint::WallFootprint;
use homebuilder_core::geometry::{intersect_floor, BoundingRect, Point, Point2, Polygon};
use homebuilder_core::id::{ComponentId, LevelId};
use homebuilder_core::level::Level;
use homebuilder_core::plan::{Plan, PlanError};
use homebuilder_core::settings::EditorSettings;
use homebuilder_core::shapes::Capsule;
use homebuilder_core::wall::Wall;

use crate::capsule::capsules_intersect;
use crate::collision::{Collision, CollisionKind, Placement, WallPair};
use crate::polygon::{convex_polygons_intersect, edge_hits, EdgeHit};

/// Sine below which two joined walls count as collinear.
const PARALLEL_SINE: f64 = 1e-9;

/// Centerline and width of the wall being checked.
#[derive(Debug, Clone, Copy)]
struct Subject {
    start: Point,
    end: Point,
    width: f64,
}

/// Two walls meeting at `at`, with the far end of each.
#[derive(Debug, Clone, Copy)]
struct Joint {
    at: Point2,
    subject_far: Point2,
    other_far: Point2,
}

fn joints(subject: &Subject, wall: &Wall) -> Vec<Joint> {
    let mut found = Vec::new();
    for (at, far) in [(subject.start, subject.end), (subject.end, subject.start)] {
        let other_far = if wall.start() == at {
            wall.end()
        } else if wall.end() == at {
            wall.start()
        } else {
            continue;
        };
        found.push(Joint {
            at: at.floor(),
            subject_far: far.floor(),
            other_far: other_far.floor(),
        });
    }
    found
}

/// Do two walls leaving `joint` overlap past their mitre?
///
/// The inner faces (the faces turned towards each other) meet at the inner
/// corner of the joint. When that corner lies beyond the far end of either
/// wall, one wall doubles back over the other. Collinear walls overlap unless
/// they leave the joint in opposite directions.
fn folds_over(joint: Point2, a: (Point2, f64), b: (Point2, f64)) -> bool {
    let da = (a.0.x - joint.x, a.0.y - joint.y);
    let db = (b.0.x - joint.x, b.0.y - joint.y);
    let (la, lb) = (da.0.hypot(da.1), db.0.hypot(db.1));
    if la == 0.0 || lb == 0.0 {
        return false;
    }
    let cross = da.0 * db.1 - da.1 * db.0;
    if cross.abs() <= PARALLEL_SINE * la * lb {
        return da.0 * db.0 + da.1 * db.1 > 0.0;
    }
    let side = cross.signum();
    let na = (-da.1 / la * side, da.0 / la * side);
    let nb = (db.1 / lb * side, -db.0 / lb * side);
    let a0 = Point2::new(joint.x + na.0 * a.1 / 2.0, joint.y + na.1 * a.1 / 2.0);
    let b0 = Point2::new(joint.x + nb.0 * b.1 / 2.0, joint.y + nb.1 * b.1 / 2.0);
    let a1 = Point2::new(a0.x + da.0, a0.y + da.1);
    let b1 = Point2::new(b0.x + db.0, b0.y + db.1);
    match intersect_floor(a0, a1, b0, b1, true).crossing() {
        Some(corner) => corner.u_a > 1.0 || corner.u_b > 1.0,
        None => false,
    }
}

/// Placement and overlap checks against the walls of one level.
///
/// Existing footprints are read as of the last [`Plan::flush`].
pub struct CollisionChecker<'a> {
    plan: &'a Plan,
    level: &'a Level,
    min_wall_length: f64,
    max_extent: f64,
}

impl<'a> CollisionChecker<'a> {
    pub fn new(plan: &'a Plan, level: LevelId) -> Result<Self, PlanError> {
        let level = plan.level(level).ok_or(PlanError::UnknownLevel(level))?;
        if level.needs_rebuild() {
            log::warn!("checking collisions on {} with footprints pending rebuild", level.id());
        }
        let defaults = EditorSettings::default();
        Ok(Self {
            plan,
            level,
            min_wall_length: defaults.min_wall_length,
            max_extent: defaults.max_extent,
        })
    }

    pub fn with_settings(mut self, settings: &EditorSettings) -> Self {
        self.min_wall_length = settings.min_wall_length;
        self.max_extent = settings.max_extent;
        self
    }

    /// Decide whether a wall from `start` to `end` may be placed.
    ///
    /// Walls sharing an endpoint with the candidate are joined to it. They
    /// collide only when one of the two doubles back over the other.
    pub fn check_placement(&self, start: Point, end: Point, width: f64) -> Result<Placement, PlanError> {
        let length = start.floor().distance_to(&end.floor());
        if length < self.min_wall_length {
            return Ok(Placement::TooShort { length });
        }
        let outside = |p: &Point| p.x.abs() > self.max_extent || p.z.abs() > self.max_extent;
        if outside(&start) || outside(&end) {
            return Ok(Placement::OutOfBounds);
        }
        let footprint = self.plan.speculative_footprint(self.level.id(), start, end, width)?;
        let collisions = self.outline_collisions(Subject { start, end, width }, &footprint, None);
        if collisions.is_empty() {
            Ok(Placement::Valid)
        } else {
            Ok(Placement::Collides(collisions))
        }
    }

    /// Existing walls whose outline crosses that of wall `id`, or that fold
    /// back over it at a shared endpoint.
    pub fn check_wall(&self, id: ComponentId) -> Result<Vec<Collision>, PlanError> {
        let wall = self.plan.wall(id).ok_or(PlanError::UnknownWall(id))?;
        let resolved;
        let footprint = match wall.footprint() {
            Some(footprint) => footprint,
            None => {
                resolved = WallFootprint::resolve(Some(id), wall.lines(), self.plan.walls_on(wall.level()));
                &resolved
            }
        };
        let subject = Subject {
            start: wall.start(),
            end: wall.end(),
            width: wall.width(),
        };
        Ok(self.outline_collisions(subject, footprint, Some(id)))
    }

    /// Every colliding pair of walls on the level, lower id first.
    pub fn all_collisions(&self) -> Vec<WallPair> {
        let mut pairs = Vec::new();
        for id in self.level.wall_ids() {
            let Ok(collisions) = self.check_wall(id) else {
                continue;
            };
            pairs.extend(
                collisions
                    .into_iter()
                    .filter(|collision| collision.wall > id)
                    .map(|collision| WallPair { first: id, collision }),
            );
        }
        pairs
    }

    /// Walls whose capsules overlap a capsule of `radius` around
    /// `start → end`. A cheap proximity test with no mitring.
    pub fn near_walls(&self, start: Point, end: Point, radius: f64) -> Result<Vec<Collision>, PlanError> {
        let capsule = Capsule::new(start, end, radius, None)?;
        let mut found = Vec::new();
        for wall in self.plan.walls_on(self.level.id()) {
            if wall.has_endpoint(&start) || wall.has_endpoint(&end) {
                continue;
            }
            if !capsules_intersect(&capsule, &wall.capsule()) {
                continue;
            }
            let ends = [start.floor(), end.floor(), wall.start().floor(), wall.end().floor()];
            let bbox = BoundingRect::from_points(&ends).map_or([0.0; 4], |rect| rect.to_array());
            found.push(Collision {
                wall: wall.id(),
                kind: CollisionKind::Capsule,
                bbox,
                hits: Vec::new(),
            });
        }
        Ok(found)
    }

    fn outline_collisions(
        &self,
        subject: Subject,
        footprint: &WallFootprint,
        skip: Option<ComponentId>,
    ) -> Vec<Collision> {
        let polygon = footprint.polygon();
        let convex = polygon.is_convex();
        let mut found = Vec::new();
        for entry in self.level.spatial().query_rect(footprint.bounds()) {
            let Some(wall) = self.plan.wall(entry.wall) else {
                continue;
            };
            if skip == Some(wall.id()) {
                continue;
            }
            let Some(other) = wall.footprint() else {
                continue;
            };
            let joints = joints(&subject, wall);
            if !joints.is_empty() {
                if let Some(collision) = fold_collision(&subject, polygon, wall, other, &joints) {
                    found.push(collision);
                }
                continue;
            }
            if !footprint.bounds().intersects(other.bounds()) {
                continue;
            }
            if convex && other.polygon().is_convex() && !convex_polygons_intersect(polygon, other.polygon()) {
                continue;
            }
            let hits = edge_hits(polygon, other.polygon());
            if hits.is_empty() {
                continue;
            }
            let points: Vec<Point2> = hits.iter().map(|hit| hit.point).collect();
            let bbox = BoundingRect::from_points(&points).unwrap_or(*other.bounds());
            found.push(Collision {
                wall: wall.id(),
                kind: CollisionKind::Outline,
                bbox: bbox.to_array(),
                hits,
            });
        }
        found.sort_by_key(|collision| collision.wall);
        found
    }
}

/// Joined walls overlap around their mitre by construction; only a fold
/// past the mitre is a collision. Crossings inside the joint are dropped
/// from the report.
fn fold_collision(
    subject: &Subject,
    polygon: &Polygon,
    wall: &Wall,
    other: &WallFootprint,
    joints: &[Joint],
) -> Option<Collision> {
    let folded: Vec<&Joint> = joints
        .iter()
        .filter(|joint| {
            folds_over(
                joint.at,
                (joint.subject_far, subject.width),
                (joint.other_far, wall.width()),
            )
        })
        .collect();
    let joint = folded.first()?;
    let reach = subject.width.max(wall.width());
    let hits: Vec<EdgeHit> = edge_hits(polygon, other.polygon())
        .into_iter()
        .filter(|hit| joints.iter().all(|joint| hit.point.distance_to(&joint.at) > reach))
        .collect();
    // the overlap runs from the joint along the shorter wall
    let shorter = if joint.at.distance_to(&joint.subject_far) < joint.at.distance_to(&joint.other_far) {
        joint.subject_far
    } else {
        joint.other_far
    };
    let mut points: Vec<Point2> = hits.iter().map(|hit| hit.point).collect();
    points.extend([joint.at, shorter]);
    let bbox = BoundingRect::from_points(&points).unwrap_or(*other.bounds());
    Some(Collision {
        wall: wall.id(),
        kind: CollisionKind::Outline,
        bbox: bbox.to_array(),
        hits,
    })
}
