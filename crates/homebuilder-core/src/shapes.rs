use crate::geometry::{angle_difference, line_to_angle_y, Direction, Line3, Point, Point2, Polygon};
use crate::wall::WallError;

/// Allowed disagreement between a stored angle and the line it describes.
pub const ANGLE_TOLERANCE: u16 = 1;

/// Check (or derive, when `angle` is `None`) the angle of `start → end`.
pub fn checked_angle(start: &Point, end: &Point, angle: Option<u16>) -> Result<u16, WallError> {
    if start.floor() == end.floor() {
        return Err(WallError::ZeroLength(*start));
    }
    let actual = line_to_angle_y(start, end);
    match angle {
        None => Ok(actual),
        Some(angle) if angle >= 360 => Err(WallError::BadAngle(angle)),
        Some(angle) if angle_difference(angle, actual) > ANGLE_TOLERANCE => {
            Err(WallError::AngleDrift { angle, actual })
        }
        Some(angle) => Ok(angle),
    }
}

/// A centerline with the two lines offset by half the width on each side.
///
/// The offset is taken perpendicular to the stored integer `angle`, not the
/// raw line direction, so walls sharing an angle get exactly parallel faces.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelLines {
    pub width: f64,
    pub angle: u16,
    pub line: Line3,
    pub left_line: Line3,
    pub right_line: Line3,
}

impl ParallelLines {
    pub fn new(start: Point, end: Point, width: f64, angle: Option<u16>) -> Result<Self, WallError> {
        let angle = checked_angle(&start, &end, angle)?;
        let offset = Direction::from_angle((angle + 90) % 360).scaled(width / 2.0);
        let line = Line3::new(start, end);
        Ok(Self {
            width,
            angle,
            line,
            left_line: line.translate(offset * -1.0),
            right_line: line.translate(offset),
        })
    }

    pub fn start(&self) -> Point {
        self.line.start
    }

    pub fn end(&self) -> Point {
        self.line.end
    }
}

/// A swept circle along a centerline: two parallel lines capped by
/// half-circles.
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    pub lines: ParallelLines,
    pub radius: f64,
}

impl Capsule {
    pub fn new(start: Point, end: Point, radius: f64, angle: Option<u16>) -> Result<Self, WallError> {
        Ok(Self {
            lines: ParallelLines::new(start, end, radius * 2.0, angle)?,
            radius,
        })
    }

    pub fn start(&self) -> Point {
        self.lines.start()
    }

    pub fn end(&self) -> Point {
        self.lines.end()
    }

    /// Outline approximated with `arc_segments` straight pieces per cap.
    pub fn outline(&self, arc_segments: usize) -> Polygon {
        let arc_segments = arc_segments.max(1);
        let base = f64::from(self.lines.angle).to_radians();
        let half_pi = std::f64::consts::FRAC_PI_2;
        let arc = |center: Point, from: f64, polygon: &mut Polygon| {
            for i in 1..arc_segments {
                let a = from + std::f64::consts::PI * i as f64 / arc_segments as f64;
                polygon.line_to(Point2::new(
                    center.x + self.radius * a.cos(),
                    center.z + self.radius * a.sin(),
                ));
            }
        };
        let mut polygon = Polygon::new(self.lines.left_line.end.floor());
        arc(self.end(), base - half_pi, &mut polygon);
        polygon.line_to(self.lines.right_line.end.floor());
        polygon.line_to(self.lines.right_line.start.floor());
        arc(self.start(), base + half_pi, &mut polygon);
        polygon.line_to(self.lines.left_line.start.floor());
        polygon.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parallel_lines_offsets() {
        let lines = ParallelLines::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(4.0, 0.0, 0.0),
            0.4,
            None,
        )
        .unwrap();
        assert_eq!(lines.angle, 0);
        assert_eq!(lines.left_line.start, Point::new(0.0, 0.0, -0.2));
        assert_eq!(lines.left_line.end, Point::new(4.0, 0.0, -0.2));
        assert_eq!(lines.right_line.start, Point::new(0.0, 0.0, 0.2));
        assert_eq!(lines.right_line.end, Point::new(4.0, 0.0, 0.2));
    }

    #[test]
    fn test_angle_tolerance() {
        let start = Point::new(0.0, 0.0, 0.0);
        let end = Point::new(10.0, 0.0, 0.1);
        assert_eq!(checked_angle(&start, &end, Some(0)), Ok(0));
        assert_eq!(checked_angle(&start, &end, Some(1)), Ok(1));
        assert_eq!(
            checked_angle(&start, &end, Some(5)),
            Err(WallError::AngleDrift { angle: 5, actual: 1 })
        );
        assert_eq!(checked_angle(&start, &end, Some(360)), Err(WallError::BadAngle(360)));
        assert_eq!(checked_angle(&start, &start, None), Err(WallError::ZeroLength(start)));
    }

    #[test]
    fn test_angle_tolerance_wraps_at_zero() {
        let start = Point::new(0.0, 0.0, 0.0);
        let end = Point::new(10.0, 0.0, -0.1);
        assert_eq!(checked_angle(&start, &end, Some(0)), Ok(0));
    }

    #[test]
    fn test_capsule_outline() {
        let capsule = Capsule::new(Point::new(0.0, 0.0, 0.0), Point::new(2.0, 0.0, 0.0), 0.5, None)
            .unwrap();
        let outline = capsule.outline(8);
        assert!(outline.is_closed());
        let bounds = outline.bounding_rect().unwrap();
        assert_relative_eq!(bounds.min.x, -0.5, epsilon = 0.05);
        assert_relative_eq!(bounds.max.x, 2.5, epsilon = 0.05);
        assert_relative_eq!(bounds.min.y, -0.5, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 0.5, epsilon = 1e-9);
    }
}
