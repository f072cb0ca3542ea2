//! Snap directions, alignment intersections and snap-point search.
//!
//! New geometry is constrained to a small set of canonical directions: the
//! four axes plus, for every wall on the level, its own angle and the
//! perpendicular/opposite companions of that angle.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::geometry::{angle_difference, intersect_y, Direction, Line3, Point, EPSILON};
use crate::id::ComponentId;
use crate::wall::{Wall, WallEnd};

pub const AXIS_ANGLES: [u16; 4] = [0, 90, 180, 270];

/// Alignment crossings closer than this to either originating wall end are
/// not interesting as guides.
pub const MIN_ALIGNMENT_DISTANCE: f64 = 0.1;

/// Length of the finite lines standing in for guide rays.
pub const GUIDE_LENGTH: f64 = 10_000.0;

/// Candidates closer together than this count as the same snap.
pub const SAME_SNAP_DISTANCE: f64 = 0.001;

/// Canonical snap angles for a set of walls, axes first.
pub fn snap_angles<'a>(walls: impl IntoIterator<Item = &'a Wall>) -> Vec<u16> {
    let mut angles = AXIS_ANGLES.to_vec();
    for wall in walls {
        let angle = wall.angle();
        let mut duplicate = false;
        for &existing in &angles {
            if existing == angle {
                duplicate = true;
                break;
            } else if angle_difference(existing, angle) == 1 {
                log::warn!("angle {} of {} is very close to {}", angle, wall.id(), existing);
            }
        }
        if !duplicate {
            angles.extend([angle, (angle + 90) % 360, (angle + 180) % 360, (angle + 270) % 360]);
        }
    }
    angles
}

pub fn snap_directions<'a>(walls: impl IntoIterator<Item = &'a Wall>) -> Vec<Direction> {
    snap_angles(walls).into_iter().map(Direction::from_angle).collect()
}

// ── Alignment intersections ──────────────────────────────────────────

/// One wall end extended along a snap direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentGuide {
    pub wall: ComponentId,
    pub end: WallEnd,
    pub angle: u16,
}

/// A point where guides from two non-adjacent walls cross.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Alignment {
    pub point: Point,
    pub first: AlignmentGuide,
    pub second: AlignmentGuide,
    /// Sum of the distances from both wall ends to `point`.
    pub distance: f64,
}

/// Alignment points keyed by their coordinates rounded to millimetres.
pub type AlignmentKey = (i64, i64);

pub fn alignment_key(point: &Point) -> AlignmentKey {
    (
        (point.x * 1000.0).round() as i64,
        (point.z * 1000.0).round() as i64,
    )
}

struct Guide<'a> {
    wall: &'a Wall,
    end: WallEnd,
    origin: Point,
    direction: Direction,
}

/// Recompute every alignment crossing between walls that do not share an
/// endpoint, keeping the closest pair of guides for each rounded position.
pub fn alignment_intersections(
    walls: &[&Wall],
    directions: &[Direction],
) -> BTreeMap<AlignmentKey, Alignment> {
    // one guide per direction class; the opposite direction is the same line
    let mut guides = Vec::new();
    for &wall in walls {
        for end in [WallEnd::Start, WallEnd::End] {
            for direction in directions.iter().filter(|d| d.angle < 180) {
                guides.push(Guide {
                    wall,
                    end,
                    origin: wall.end_point(end),
                    direction: *direction,
                });
            }
        }
    }

    let mut found: BTreeMap<AlignmentKey, Alignment> = BTreeMap::new();
    for (i, a) in guides.iter().enumerate() {
        for b in &guides[..i] {
            if a.wall.id() == b.wall.id()
                || a.wall.is_adjacent_to(b.wall)
                || a.direction.is_parallel_to(&b.direction)
            {
                continue;
            }
            let a_end = a.origin + a.direction.scaled(1.0);
            let b_end = b.origin + b.direction.scaled(1.0);
            let Some(hit) = intersect_y(&a.origin, &a_end, &b.origin, &b_end, true).crossing() else {
                continue;
            };
            let distance_a = hit.point.floor().distance_to(&a.origin.floor());
            let distance_b = hit.point.floor().distance_to(&b.origin.floor());
            if distance_a < MIN_ALIGNMENT_DISTANCE || distance_b < MIN_ALIGNMENT_DISTANCE {
                continue;
            }
            let candidate = Alignment {
                point: hit.point,
                first: AlignmentGuide {
                    wall: a.wall.id(),
                    end: a.end,
                    angle: a.direction.angle,
                },
                second: AlignmentGuide {
                    wall: b.wall.id(),
                    end: b.end,
                    angle: b.direction.angle,
                },
                distance: distance_a + distance_b,
            };
            found
                .entry(alignment_key(&hit.point))
                .and_modify(|existing| {
                    if candidate.distance < existing.distance {
                        *existing = candidate;
                    }
                })
                .or_insert(candidate);
        }
    }
    found
}

// ── Snap-point search ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapKind {
    WallStart,
    WallEnd,
    AlignStart,
    AlignEnd,
    AlignIntersection,
    Continuation,
    Grid,
}

/// A candidate position for the cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapCandidate {
    pub point: Point,
    /// Distance from the (continuation-adjusted) query point.
    pub distance: f64,
    pub kind: SnapKind,
    pub wall: Option<ComponentId>,
    pub direction: Option<Direction>,
}

/// What the placement tool is asking for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapQuery {
    /// Cursor position on the floor plane.
    pub point: Point,
    /// The fixed start point while the end of a wall is being placed.
    pub anchor: Option<Point>,
    pub threshold: f64,
    pub grid_step: f64,
}

struct Continuation {
    line: Line3,
    direction: Direction,
    point: Point,
    distance: f64,
}

struct AlignmentHit {
    point: Point,
    distance: f64,
    line: Line3,
    wall: ComponentId,
    end: WallEnd,
    direction: Direction,
    crossed: bool,
}

/// Accept a candidate only if it improves on (or repeats) the last accepted
/// one and stays on the continuation line, when there is one.
fn accepts(
    candidates: &[SnapCandidate],
    continuation: Option<&Continuation>,
    threshold: f64,
    point: &Point,
    distance: f64,
) -> bool {
    distance < threshold
        && candidates
            .last()
            .map_or(true, |last| distance < last.distance || *point == last.point)
        && continuation.map_or(true, |c| {
            c.line.closest_point_to_point(point, true).distance_to(point) <= EPSILON
        })
}

fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Search the snap candidates for `query` among `walls`.
///
/// Wall ends win over alignment guides, which win over the continuation or
/// grid fallback; the fallback guarantees the result is never empty.
pub fn find_snap_points(walls: &[&Wall], directions: &[Direction], query: &SnapQuery) -> Vec<SnapCandidate> {
    let threshold = query.threshold;
    let mut point = query.point;
    let mut candidates: Vec<SnapCandidate> = Vec::new();

    // when placing an end point, first pin the cursor to the best direction
    let mut continuation: Option<Continuation> = None;
    if let Some(anchor) = query.anchor.filter(|anchor| *anchor != point) {
        for direction in directions {
            let line = Line3::new(anchor, anchor + direction.scaled(GUIDE_LENGTH));
            let closest = line.closest_point_to_point(&point, true);
            let distance = closest.distance_to(&point);
            if closest != anchor && continuation.as_ref().map_or(true, |c| distance < c.distance) {
                continuation = Some(Continuation {
                    line,
                    direction: *direction,
                    point: closest,
                    distance,
                });
            }
        }
        if let Some(c) = &continuation {
            point = c.point;
        }
    }

    // nearby wall ends, gathering alignment guides while none is found
    let mut alignments: Vec<AlignmentHit> = Vec::new();
    for wall in walls {
        for end in [WallEnd::Start, WallEnd::End] {
            let end_point = wall.end_point(end);
            let distance = end_point.distance_to(&point);
            if accepts(&candidates, continuation.as_ref(), threshold, &end_point, distance) {
                candidates.push(SnapCandidate {
                    point: end_point,
                    distance,
                    kind: match end {
                        WallEnd::Start => SnapKind::WallStart,
                        WallEnd::End => SnapKind::WallEnd,
                    },
                    wall: Some(wall.id()),
                    direction: None,
                });
            }
            if !candidates.is_empty() {
                continue;
            }
            for direction in directions {
                let line = Line3::new(end_point, end_point + direction.scaled(GUIDE_LENGTH));
                let closest = line.closest_point_to_point(&point, true);
                let distance = closest.distance_to(&point);
                if distance < threshold && closest != end_point {
                    alignments.push(AlignmentHit {
                        point: closest,
                        distance,
                        line,
                        wall: wall.id(),
                        end,
                        direction: *direction,
                        crossed: false,
                    });
                }
            }
        }
    }

    if candidates.is_empty() && !alignments.is_empty() {
        for i in 0..alignments.len() {
            for j in 0..i {
                let (a, b) = (&alignments[i], &alignments[j]);
                let Some(hit) =
                    intersect_y(&a.line.start, &a.line.end, &b.line.start, &b.line.end, true).crossing()
                else {
                    continue;
                };
                let distance = hit.point.distance_to(&point);
                if !accepts(&candidates, continuation.as_ref(), threshold, &hit.point, distance) {
                    continue;
                }
                for guide in [a, b] {
                    candidates.push(SnapCandidate {
                        point: hit.point,
                        distance,
                        kind: SnapKind::AlignIntersection,
                        wall: Some(guide.wall),
                        direction: Some(guide.direction),
                    });
                }
                alignments[i].crossed = true;
                alignments[j].crossed = true;
            }
        }
        for alignment in alignments.iter().filter(|a| !a.crossed) {
            if accepts(&candidates, continuation.as_ref(), threshold, &alignment.point, alignment.distance) {
                candidates.push(SnapCandidate {
                    point: alignment.point,
                    distance: alignment.distance,
                    kind: match alignment.end {
                        WallEnd::Start => SnapKind::AlignStart,
                        WallEnd::End => SnapKind::AlignEnd,
                    },
                    wall: Some(alignment.wall),
                    direction: Some(alignment.direction),
                });
            }
        }
    }

    if candidates.is_empty() {
        let candidate = match &continuation {
            Some(c) => {
                let length = round_to(c.point.distance_to(&c.line.start), query.grid_step);
                let snapped = c.line.start + c.direction.scaled(length);
                SnapCandidate {
                    point: snapped,
                    distance: snapped.distance_to(&point),
                    kind: SnapKind::Continuation,
                    wall: None,
                    direction: Some(c.direction),
                }
            }
            None => {
                let snapped = Point::new(
                    round_to(point.x, query.grid_step),
                    point.y,
                    round_to(point.z, query.grid_step),
                );
                SnapCandidate {
                    point: snapped,
                    distance: snapped.distance_to(&point),
                    kind: SnapKind::Grid,
                    wall: None,
                    direction: None,
                }
            }
        };
        candidates.push(candidate);
    }
    candidates
}

/// Reduce candidates to the closest one plus any that land on the same spot.
pub fn closest_snaps(candidates: &[SnapCandidate]) -> Vec<SnapCandidate> {
    let mut snaps: Vec<SnapCandidate> = Vec::new();
    for candidate in candidates {
        match snaps.first() {
            Some(best) if candidate.distance >= best.distance => {
                if candidate.point.distance_to(&best.point) <= SAME_SNAP_DISTANCE {
                    snaps.push(candidate.clone());
                }
            }
            _ => snaps = vec![candidate.clone()],
        }
    }
    snaps
}
