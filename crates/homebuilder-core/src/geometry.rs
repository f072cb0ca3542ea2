use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Distance under which two floor-plan points are considered to coincide.
pub const EPSILON: f64 = 0.0001;

/// A point in world space. `y` is height; walls live on the x/z floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    pub fn distance_squared_to(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(&self, other: &Point, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    pub fn with_y(&self, y: f64) -> Self {
        Self { y, ..*self }
    }

    /// Projection onto the floor plane.
    pub fn floor(&self) -> Point2 {
        Point2::new(self.x, self.z)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A point on the floor plane; `y` holds the world `z` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A finite line between two world points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3 {
    pub start: Point,
    pub end: Point,
}

impl Line3 {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn delta(&self) -> Point {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn at(&self, t: f64) -> Point {
        self.start.lerp(&self.end, t)
    }

    /// Parameter of the point on this line closest to `point`, clamped to the
    /// segment when `clamp` is set. A zero-length line always yields 0.
    pub fn closest_point_parameter(&self, point: &Point, clamp: bool) -> f64 {
        let delta = self.delta();
        let length_sq = delta.dot(&delta);
        if length_sq == 0.0 {
            return 0.0;
        }
        let t = (*point - self.start).dot(&delta) / length_sq;
        if clamp {
            t.clamp(0.0, 1.0)
        } else {
            t
        }
    }

    pub fn closest_point_to_point(&self, point: &Point, clamp: bool) -> Point {
        self.at(self.closest_point_parameter(point, clamp))
    }

    /// Copy of this line shifted by `offset`.
    pub fn translate(&self, offset: Point) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

// ── Angles ───────────────────────────────────────────────────────────

/// Integer floor-plan angle in degrees (`0..360`) of the direction from
/// `start` to `end`, measured from +x towards +z.
pub fn line_to_angle_y(start: &Point, end: &Point) -> u16 {
    let degrees = (end.z - start.z).atan2(end.x - start.x).to_degrees().round() as i32;
    degrees.rem_euclid(360) as u16
}

/// Smallest circular difference between two angles, in degrees.
pub fn angle_difference(a: u16, b: u16) -> u16 {
    let d = (i32::from(a) - i32::from(b)).rem_euclid(360);
    d.min(360 - d) as u16
}

/// A unit direction on the floor plane tagged with the angle it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub angle: u16,
    pub x: f64,
    pub z: f64,
}

impl Direction {
    /// Axis angles are exact so that axis-aligned walls stay exactly
    /// axis-aligned after offsetting.
    pub fn from_angle(angle: u16) -> Self {
        let angle = angle % 360;
        let (x, z) = match angle {
            0 => (1.0, 0.0),
            90 => (0.0, 1.0),
            180 => (-1.0, 0.0),
            270 => (0.0, -1.0),
            _ => {
                let rad = f64::from(angle).to_radians();
                (rad.cos(), rad.sin())
            }
        };
        Self { angle, x, z }
    }

    /// The direction as a world-space vector of the given length.
    pub fn scaled(&self, length: f64) -> Point {
        Point::new(self.x * length, 0.0, self.z * length)
    }

    /// Parallel directions share the same `angle % 180`.
    pub fn is_parallel_to(&self, other: &Direction) -> bool {
        self.angle % 180 == other.angle % 180
    }
}

// ── Line intersection ────────────────────────────────────────────────

/// A proper intersection between two lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing<P = Point> {
    pub point: P,
    /// Position along line A (0 = start, 1 = end).
    pub u_a: f64,
    /// Position along line B.
    pub u_b: f64,
    pub in_a: bool,
    pub in_b: bool,
}

/// Result of intersecting two lines on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineIntersection<P = Point> {
    /// One of the lines has zero length.
    Degenerate,
    /// The lines never meet.
    Parallel,
    /// Bounded mode only: the lines meet outside one of the segments.
    Disjoint,
    Crossing(Crossing<P>),
}

impl<P> LineIntersection<P> {
    pub fn crossing(self) -> Option<Crossing<P>> {
        match self {
            LineIntersection::Crossing(c) => Some(c),
            _ => None,
        }
    }
}

enum Solved {
    Degenerate,
    Parallel,
    At(f64, f64),
}

// Paul Bourke's two-line intersection on plain x/y pairs.
#[allow(clippy::too_many_arguments)]
fn solve(x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64, x4: f64, y4: f64) -> Solved {
    if (x1 == x2 && y1 == y2) || (x3 == x4 && y3 == y4) {
        return Solved::Degenerate;
    }
    let denominator = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denominator == 0.0 {
        return Solved::Parallel;
    }
    let u_a = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denominator;
    let u_b = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denominator;
    Solved::At(u_a, u_b)
}

fn within(u: f64) -> bool {
    (0.0..=1.0).contains(&u)
}

/// Intersect line A (`start_a → end_a`) with line B on the x/z plane.
///
/// With `infinite_lines` unset a crossing outside either segment reports
/// [`LineIntersection::Disjoint`]. The height of the crossing point is
/// interpolated along line A.
pub fn intersect_y(
    start_a: &Point,
    end_a: &Point,
    start_b: &Point,
    end_b: &Point,
    infinite_lines: bool,
) -> LineIntersection {
    let (u_a, u_b) = match solve(
        start_a.x, start_a.z, end_a.x, end_a.z, start_b.x, start_b.z, end_b.x, end_b.z,
    ) {
        Solved::Degenerate => return LineIntersection::Degenerate,
        Solved::Parallel => return LineIntersection::Parallel,
        Solved::At(u_a, u_b) => (u_a, u_b),
    };
    let (in_a, in_b) = (within(u_a), within(u_b));
    if !infinite_lines && !(in_a && in_b) {
        return LineIntersection::Disjoint;
    }
    LineIntersection::Crossing(Crossing {
        point: start_a.lerp(end_a, u_a),
        u_a,
        u_b,
        in_a,
        in_b,
    })
}

/// [`intersect_y`] for points already projected onto the floor plane.
pub fn intersect_floor(
    start_a: Point2,
    end_a: Point2,
    start_b: Point2,
    end_b: Point2,
    infinite_lines: bool,
) -> LineIntersection<Point2> {
    let (u_a, u_b) = match solve(
        start_a.x, start_a.y, end_a.x, end_a.y, start_b.x, start_b.y, end_b.x, end_b.y,
    ) {
        Solved::Degenerate => return LineIntersection::Degenerate,
        Solved::Parallel => return LineIntersection::Parallel,
        Solved::At(u_a, u_b) => (u_a, u_b),
    };
    let (in_a, in_b) = (within(u_a), within(u_b));
    if !infinite_lines && !(in_a && in_b) {
        return LineIntersection::Disjoint;
    }
    LineIntersection::Crossing(Crossing {
        point: Point2::new(
            start_a.x + u_a * (end_a.x - start_a.x),
            start_a.y + u_a * (end_a.y - start_a.y),
        ),
        u_a,
        u_b,
        in_a,
        in_b,
    })
}

// ── Bounding rectangle ───────────────────────────────────────────────

/// An axis-aligned rectangle on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingRect {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point2]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point2::new(min_x, min_y),
            max: Point2::new(max_x, max_y),
        })
    }

    /// Overlap on both axes; touching edges count.
    pub fn intersects(&self, other: &BoundingRect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// `[min_x, min_y, max_x, max_y]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }
}

// ── Polygon ──────────────────────────────────────────────────────────

/// A floor-plan polygon. Once closed the first vertex is repeated as the
/// last one, so edges are simply consecutive vertex pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point2>,
    closed: bool,
}

impl Polygon {
    pub fn new(start: Point2) -> Self {
        Self {
            vertices: vec![start],
            closed: false,
        }
    }

    /// Build and close a polygon from its distinct vertices.
    pub fn from_vertices(vertices: impl IntoIterator<Item = Point2>) -> Self {
        let mut vertices = vertices.into_iter();
        let mut polygon = Polygon::new(vertices.next().unwrap_or_default());
        for v in vertices {
            polygon.line_to(v);
        }
        polygon.close()
    }

    pub fn line_to(&mut self, point: Point2) {
        debug_assert!(!self.closed, "line_to on a closed polygon");
        self.vertices.push(point);
    }

    pub fn close(mut self) -> Self {
        debug_assert!(!self.closed, "polygon closed twice");
        debug_assert!(self.vertices.len() > 1, "polygon needs at least two vertices");
        self.vertices.push(self.vertices[0]);
        self.closed = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        self.vertices.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn bounding_rect(&self) -> Option<BoundingRect> {
        BoundingRect::from_points(&self.vertices)
    }

    /// Shoelace area; positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            / 2.0
    }

    /// Even-odd containment test; points on an edge may go either way.
    pub fn contains_point(&self, p: &Point2) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when every turn goes the same way. Collinear vertices and
    /// repeated points are ignored.
    pub fn is_convex(&self) -> bool {
        let mut points: Vec<Point2> = Vec::with_capacity(self.vertices.len());
        for v in &self.vertices[..self.vertices.len().saturating_sub(1)] {
            if points.last() != Some(v) {
                points.push(*v);
            }
        }
        let n = points.len();
        if n < 3 {
            return true;
        }
        let mut sign = 0.0;
        for i in 0..n {
            let (a, b, c) = (points[i], points[(i + 1) % n], points[(i + 2) % n]);
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() <= f64::EPSILON {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 0.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_line_to_angle() {
        let origin = Point::default();
        assert_eq!(line_to_angle_y(&origin, &Point::new(4.0, 0.0, 0.0)), 0);
        assert_eq!(line_to_angle_y(&origin, &Point::new(0.0, 0.0, 4.0)), 90);
        assert_eq!(line_to_angle_y(&origin, &Point::new(-4.0, 0.0, 0.0)), 180);
        assert_eq!(line_to_angle_y(&origin, &Point::new(0.0, 0.0, -4.0)), 270);
        assert_eq!(line_to_angle_y(&origin, &Point::new(1.0, 0.0, 1.0)), 45);
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert_eq!(angle_difference(359, 0), 1);
        assert_eq!(angle_difference(0, 359), 1);
        assert_eq!(angle_difference(90, 270), 180);
        assert_eq!(angle_difference(10, 12), 2);
    }

    #[test]
    fn test_axis_directions_are_exact() {
        let d = Direction::from_angle(90);
        assert_eq!((d.x, d.z), (0.0, 1.0));
        let d = Direction::from_angle(450);
        assert_eq!(d.angle, 90);
        assert!(Direction::from_angle(30).is_parallel_to(&Direction::from_angle(210)));
        assert!(!Direction::from_angle(30).is_parallel_to(&Direction::from_angle(120)));
    }

    #[test]
    fn test_intersect_crossing() {
        let hit = intersect_y(
            &Point::new(0.0, 0.0, 0.0),
            &Point::new(4.0, 0.0, 0.0),
            &Point::new(2.0, 0.0, -1.0),
            &Point::new(2.0, 0.0, 1.0),
            false,
        )
        .crossing()
        .unwrap();
        assert_relative_eq!(hit.point.x, 2.0);
        assert_relative_eq!(hit.point.z, 0.0);
        assert_relative_eq!(hit.u_a, 0.5);
        assert_relative_eq!(hit.u_b, 0.5);
        assert!(hit.in_a && hit.in_b);
    }

    #[test]
    fn test_intersect_sentinels() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        assert_eq!(intersect_y(&a, &a, &a, &b, true), LineIntersection::Degenerate);
        let c = Point::new(0.0, 0.0, 1.0);
        let d = Point::new(1.0, 0.0, 1.0);
        assert_eq!(intersect_y(&a, &b, &c, &d, true), LineIntersection::Parallel);
    }

    #[test]
    fn test_intersect_bounded_vs_infinite() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(3.0, 0.0, -1.0);
        let d = Point::new(3.0, 0.0, 1.0);
        assert_eq!(intersect_y(&a, &b, &c, &d, false), LineIntersection::Disjoint);
        let hit = intersect_y(&a, &b, &c, &d, true).crossing().unwrap();
        assert_relative_eq!(hit.u_a, 3.0);
        assert!(!hit.in_a);
        assert!(hit.in_b);
    }

    #[test]
    fn test_bounding_rect_intersection() {
        let a = BoundingRect::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let b = BoundingRect::new(Point2::new(5.0, 5.0), Point2::new(15.0, 15.0));
        let c = BoundingRect::new(Point2::new(20.0, 20.0), Point2::new(30.0, 30.0));
        let touching = BoundingRect::new(Point2::new(10.0, 0.0), Point2::new(12.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_polygon_closes() {
        let mut p = Polygon::new(Point2::new(0.0, 0.0));
        p.line_to(Point2::new(1.0, 0.0));
        p.line_to(Point2::new(1.0, 1.0));
        let p = p.close();
        assert!(p.is_closed());
        assert_eq!(p.vertex_count(), 4);
        assert_eq!(p.vertices().first(), p.vertices().last());
        assert_eq!(p.edges().count(), 3);
    }

    #[test]
    fn test_polygon_convexity() {
        let square = Polygon::from_vertices([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]);
        assert!(square.is_convex());
        assert_relative_eq!(square.signed_area(), 1.0);
        let notch = Polygon::from_vertices([
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(1.0, 0.5),
            Point2::new(0.0, 2.0),
        ]);
        assert!(!notch.is_convex());
        assert!(notch.contains_point(&Point2::new(1.0, 0.25)));
        assert!(!notch.contains_point(&Point2::new(1.0, 1.5)));
        assert!(!notch.contains_point(&Point2::new(3.0, 1.0)));
    }
}
