//! Mitred wall outlines.
//!
//! Each wall has four corners (left/right face × start/end). A corner is
//! pulled onto the face of every other wall that shares that endpoint; when
//! several walls compete the innermost mitre wins.

use crate::geometry::{intersect_y, BoundingRect, Line3, Point, Polygon};
use crate::id::ComponentId;
use crate::shapes::ParallelLines;
use crate::wall::Wall;

/// The resolved outline of a wall, or of a speculative wall with no owner.
#[derive(Debug, Clone, PartialEq)]
pub struct WallFootprint {
    owner: Option<ComponentId>,
    left_line: Line3,
    right_line: Line3,
    polygon: Polygon,
    bounds: BoundingRect,
}

/// A resolved corner. `point` is `None` when the corner is pinned by a
/// parallel continuation and the raw face endpoint should be used.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Corner {
    u: f64,
    point: Option<Point>,
}

/// Which competing corner survives.
#[derive(Debug, Clone, Copy)]
enum Keep {
    /// Start corners: the larger position along the face wins.
    Greater,
    /// End corners: the smaller position wins.
    Lesser,
}

impl Keep {
    fn prefers(self, existing: f64, candidate: f64) -> bool {
        match self {
            Keep::Greater => existing < candidate,
            Keep::Lesser => existing > candidate,
        }
    }
}

fn parallel(cond: bool, corner: Option<Corner>, u: f64) -> Option<Corner> {
    let replace = match corner {
        None => true,
        Some(existing) if u > 0.0 => existing.u > u,
        Some(existing) => existing.u < u,
    };
    if cond && replace {
        Some(Corner { u, point: None })
    } else {
        corner
    }
}

fn intersect(cond: bool, corner: Option<Corner>, face: &Line3, other: &Line3, keep: Keep) -> Option<Corner> {
    if !cond {
        return corner;
    }
    match intersect_y(&face.start, &face.end, &other.start, &other.end, true).crossing() {
        Some(hit) if corner.map_or(true, |existing| keep.prefers(existing.u, hit.u_a)) => Some(Corner {
            u: hit.u_a,
            point: Some(hit.point),
        }),
        _ => corner,
    }
}

impl WallFootprint {
    /// Resolve the outline of `lines` against every wall in `neighbours`
    /// (the wall named `owner` is skipped).
    pub fn resolve<'a>(
        owner: Option<ComponentId>,
        lines: &ParallelLines,
        neighbours: impl IntoIterator<Item = &'a Wall>,
    ) -> Self {
        let (start, end) = (lines.start(), lines.end());
        let (left, right) = (&lines.left_line, &lines.right_line);
        let mut left_start = None;
        let mut right_start = None;
        let mut left_end = None;
        let mut right_end = None;

        for wall in neighbours {
            if Some(wall.id()) == owner {
                continue;
            }
            let start_start = wall.start() == start;
            let start_end = !start_start && wall.end() == start;
            let end_start = wall.start() == end;
            let end_end = !end_start && wall.end() == end;
            if !(start_start || start_end || end_start || end_end) {
                continue;
            }
            if wall.angle() == lines.angle || wall.angle() == (lines.angle + 180) % 360 {
                left_start = parallel(start_start || start_end, left_start, 0.0);
                right_start = parallel(start_start || start_end, right_start, 0.0);
                left_end = parallel(end_start || end_end, left_end, 1.0);
                right_end = parallel(end_start || end_end, right_end, 1.0);
            } else {
                let (other_left, other_right) = (wall.left_line(), wall.right_line());
                left_start = intersect(start_start, left_start, left, other_right, Keep::Greater);
                left_start = intersect(start_end, left_start, left, other_left, Keep::Greater);
                right_start = intersect(start_start, right_start, right, other_left, Keep::Greater);
                right_start = intersect(start_end, right_start, right, other_right, Keep::Greater);
                left_end = intersect(end_start, left_end, left, other_left, Keep::Lesser);
                left_end = intersect(end_end, left_end, left, other_right, Keep::Lesser);
                right_end = intersect(end_start, right_end, right, other_right, Keep::Lesser);
                right_end = intersect(end_end, right_end, right, other_left, Keep::Lesser);
            }
        }

        let corner_or = |corner: Option<Corner>, fallback: Point| {
            corner.and_then(|c| c.point).unwrap_or(fallback).floor()
        };
        let mut polygon = Polygon::new(start.floor());
        polygon.line_to(corner_or(left_start, left.start));
        polygon.line_to(corner_or(left_end, left.end));
        polygon.line_to(end.floor());
        polygon.line_to(corner_or(right_end, right.end));
        polygon.line_to(corner_or(right_start, right.start));
        let polygon = polygon.close();
        let bounds = polygon
            .bounding_rect()
            .unwrap_or_else(|| BoundingRect::new(start.floor(), end.floor()));

        Self {
            owner,
            left_line: *left,
            right_line: *right,
            polygon,
            bounds,
        }
    }

    pub fn owner(&self) -> Option<ComponentId> {
        self.owner
    }

    pub fn left_line(&self) -> &Line3 {
        &self.left_line
    }

    pub fn right_line(&self) -> &Line3 {
        &self.right_line
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn bounds(&self) -> &BoundingRect {
        &self.bounds
    }
}
