//! Capsule narrow phase: two capsules overlap when their centerlines come
//! closer than the sum of the radii.

use homebuilder_core::geometry::Point2;
use homebuilder_core::shapes::Capsule;

const PARALLEL_EPSILON: f64 = 1e-12;

fn dot(a: Point2, b: Point2) -> f64 {
    a.x * b.x + a.y * b.y
}

fn sub(a: Point2, b: Point2) -> Point2 {
    Point2::new(a.x - b.x, a.y - b.y)
}

fn along(p: Point2, d: Point2, t: f64) -> Point2 {
    Point2::new(p.x + d.x * t, p.y + d.y * t)
}

/// Closest points between segments `p1 → q1` and `p2 → q2`.
///
/// Returns the point on each segment; degenerate segments act as points.
pub fn closest_points_between_segments(p1: Point2, q1: Point2, p2: Point2, q2: Point2) -> (Point2, Point2) {
    let d1 = sub(q1, p1);
    let d2 = sub(q2, p2);
    let r = sub(p1, p2);
    let a = dot(d1, d1);
    let e = dot(d2, d2);
    let f = dot(d2, r);

    let (s, t) = if a <= PARALLEL_EPSILON && e <= PARALLEL_EPSILON {
        (0.0, 0.0)
    } else if a <= PARALLEL_EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = dot(d1, r);
        if e <= PARALLEL_EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = dot(d1, d2);
            let denom = a * e - b * b;
            // parallel segments: any s works, start from p1
            let s = if denom > PARALLEL_EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };
    (along(p1, d1, s), along(p2, d2, t))
}

pub fn segment_distance(p1: Point2, q1: Point2, p2: Point2, q2: Point2) -> f64 {
    let (a, b) = closest_points_between_segments(p1, q1, p2, q2);
    a.distance_to(&b)
}

/// Strict overlap: capsules that only touch do not intersect.
pub fn capsules_intersect(a: &Capsule, b: &Capsule) -> bool {
    let distance = segment_distance(
        a.start().floor(),
        a.end().floor(),
        b.start().floor(),
        b.end().floor(),
    );
    a.radius + b.radius - distance > 0.0
}
