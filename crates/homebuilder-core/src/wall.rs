use serde::Serialize;
use thiserror::Error;

use crate::footprint::WallFootprint;
use crate::geometry::{Line3, Point, EPSILON};
use crate::id::{ComponentId, LevelId};
use crate::shapes::{Capsule, ParallelLines};

/// Geometry invariant violations of a single wall.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WallError {
    #[error("angle {angle}° is more than 1° away from the line's {actual}°")]
    AngleDrift { angle: u16, actual: u16 },

    #[error("angle {0} is outside 0..360")]
    BadAngle(u16),

    #[error("zero-length wall at {0:?}")]
    ZeroLength(Point),

    #[error("split point {at:?} is not strictly inside wall {wall}")]
    BadSplit { wall: ComponentId, at: Point },
}

/// Which end of a wall's centerline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WallEnd {
    Start,
    End,
}

/// A straight wall on a Level.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    id: ComponentId,
    level: LevelId,
    height: f64,
    lines: ParallelLines,
    footprint: Option<WallFootprint>,
}

impl Wall {
    pub(crate) fn new(
        id: ComponentId,
        level: LevelId,
        start: Point,
        end: Point,
        angle: Option<u16>,
        width: f64,
        height: f64,
    ) -> Result<Self, WallError> {
        Ok(Self {
            id,
            level,
            height,
            lines: ParallelLines::new(start, end, width, angle)?,
            footprint: None,
        })
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn level(&self) -> LevelId {
        self.level
    }

    pub fn start(&self) -> Point {
        self.lines.start()
    }

    pub fn end(&self) -> Point {
        self.lines.end()
    }

    pub fn end_point(&self, end: WallEnd) -> Point {
        match end {
            WallEnd::Start => self.start(),
            WallEnd::End => self.end(),
        }
    }

    pub fn angle(&self) -> u16 {
        self.lines.angle
    }

    pub fn width(&self) -> f64 {
        self.lines.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn centerline(&self) -> &Line3 {
        &self.lines.line
    }

    pub fn left_line(&self) -> &Line3 {
        &self.lines.left_line
    }

    pub fn right_line(&self) -> &Line3 {
        &self.lines.right_line
    }

    pub fn lines(&self) -> &ParallelLines {
        &self.lines
    }

    pub fn length(&self) -> f64 {
        self.lines.line.length()
    }

    /// The resolved outline, once the owning level has flushed it.
    pub fn footprint(&self) -> Option<&WallFootprint> {
        self.footprint.as_ref()
    }

    /// A collision capsule around the centerline with radius width / 2.
    pub fn capsule(&self) -> Capsule {
        Capsule {
            lines: self.lines.clone(),
            radius: self.lines.width / 2.0,
        }
    }

    pub fn has_endpoint(&self, point: &Point) -> bool {
        self.start() == *point || self.end() == *point
    }

    /// Do the two walls meet at a shared endpoint?
    pub fn is_adjacent_to(&self, other: &Wall) -> bool {
        self.has_endpoint(&other.start()) || self.has_endpoint(&other.end())
    }

    /// Move both ends, keeping the stored angle. Returns the previous ends.
    pub(crate) fn set(&mut self, start: Point, end: Point) -> Result<(Point, Point), WallError> {
        let old = (self.start(), self.end());
        self.lines = ParallelLines::new(start, end, self.lines.width, Some(self.lines.angle))?;
        Ok(old)
    }

    /// `at` must lie on the centerline and differ from both ends.
    pub fn check_split(&self, at: &Point) -> Result<(), WallError> {
        let on_line = self.lines.line.closest_point_to_point(at, true).distance_to(at) <= EPSILON;
        if !on_line || self.has_endpoint(at) {
            return Err(WallError::BadSplit { wall: self.id, at: *at });
        }
        Ok(())
    }

    pub(crate) fn set_footprint(&mut self, footprint: WallFootprint) {
        self.footprint = Some(footprint);
    }
}

/// Serializable view of a wall for reports and external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallSummary {
    pub id: ComponentId,
    pub level: LevelId,
    pub start: Point,
    pub end: Point,
    pub angle: u16,
    pub width: f64,
    pub height: f64,
}

impl From<&Wall> for WallSummary {
    fn from(wall: &Wall) -> Self {
        Self {
            id: wall.id(),
            level: wall.level(),
            start: wall.start(),
            end: wall.end(),
            angle: wall.angle(),
            width: wall.width(),
            height: wall.height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(start: Point, end: Point) -> Wall {
        Wall::new(
            ComponentId::from_raw(2),
            LevelId::from_raw(1),
            start,
            end,
            None,
            0.4,
            2.4,
        )
        .unwrap()
    }

    #[test]
    fn test_wall_derives_angle() {
        let w = wall(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 3.0));
        assert_eq!(w.angle(), 90);
        assert!((w.length() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_set_keeps_angle_within_tolerance() {
        let mut w = wall(Point::new(0.0, 0.0, 0.0), Point::new(4.0, 0.0, 0.0));
        let old = w.set(Point::new(1.0, 0.0, 0.0), Point::new(6.0, 0.0, 0.0)).unwrap();
        assert_eq!(old.1, Point::new(4.0, 0.0, 0.0));
        assert_eq!(w.start(), Point::new(1.0, 0.0, 0.0));
        assert_eq!(w.angle(), 0);

        let err = w.set(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 4.0)).unwrap_err();
        assert_eq!(err, WallError::AngleDrift { angle: 0, actual: 90 });
        // a failed set leaves the wall untouched
        assert_eq!(w.end(), Point::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_check_split() {
        let w = wall(Point::new(0.0, 0.0, 0.0), Point::new(4.0, 0.0, 0.0));
        assert!(w.check_split(&Point::new(2.0, 0.0, 0.0)).is_ok());
        assert!(w.check_split(&Point::new(0.0, 0.0, 0.0)).is_err());
        assert!(w.check_split(&Point::new(2.0, 0.0, 0.5)).is_err());
        assert!(w.check_split(&Point::new(5.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_adjacency() {
        let a = wall(Point::new(0.0, 0.0, 0.0), Point::new(4.0, 0.0, 0.0));
        let b = wall(Point::new(4.0, 0.0, 0.0), Point::new(4.0, 0.0, 4.0));
        let c = wall(Point::new(5.0, 0.0, 0.0), Point::new(9.0, 0.0, 0.0));
        assert!(a.is_adjacent_to(&b));
        assert!(!a.is_adjacent_to(&c));
    }
}
