use std::ops::ControlFlow;

use serde::Serialize;

use homebuilder_core::geometry::{intersect_floor, Point2, Polygon};

/// One crossing between an edge of polygon A and an edge of polygon B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeHit {
    /// Index of the edge in A (edge `i` runs from vertex `i` to `i + 1`).
    pub edge_a: usize,
    pub edge_b: usize,
    pub point: Point2,
    pub u_a: f64,
    pub u_b: f64,
}

fn visit_crossings(a: &Polygon, b: &Polygon, mut visit: impl FnMut(EdgeHit) -> ControlFlow<()>) -> bool {
    let mut found = false;
    for (edge_a, (a0, a1)) in a.edges().enumerate() {
        for (edge_b, (b0, b1)) in b.edges().enumerate() {
            let Some(crossing) = intersect_floor(a0, a1, b0, b1, false).crossing() else {
                continue;
            };
            found = true;
            let hit = EdgeHit {
                edge_a,
                edge_b,
                point: crossing.point,
                u_a: crossing.u_a,
                u_b: crossing.u_b,
            };
            if visit(hit).is_break() {
                return true;
            }
        }
    }
    found
}

/// Exact outline test: does any edge of `a` cross or touch any edge of `b`?
///
/// One polygon lying entirely inside the other has no crossing edges and is
/// not reported.
pub fn polygons_intersect(a: &Polygon, b: &Polygon) -> bool {
    visit_crossings(a, b, |_| ControlFlow::Break(()))
}

/// Like [`polygons_intersect`], but every crossing is passed to `listener`
/// and the search never stops early.
pub fn polygons_intersect_with(a: &Polygon, b: &Polygon, mut listener: impl FnMut(&EdgeHit)) -> bool {
    visit_crossings(a, b, |hit| {
        listener(&hit);
        ControlFlow::Continue(())
    })
}

pub fn edge_hits(a: &Polygon, b: &Polygon) -> Vec<EdgeHit> {
    let mut hits = Vec::new();
    polygons_intersect_with(a, b, |hit| hits.push(*hit));
    hits
}

// ── Separating axis test (convex only) ──────────────────────────────

fn project(vertices: &[Point2], ax: f64, ay: f64) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in vertices {
        let dot = v.x * ax + v.y * ay;
        lo = lo.min(dot);
        hi = hi.max(dot);
    }
    (lo, hi)
}

fn separated_along_edges_of(edges: &Polygon, a: &Polygon, b: &Polygon) -> bool {
    edges.edges().any(|(p, q)| {
        let (ax, ay) = (-(q.y - p.y), q.x - p.x);
        if ax == 0.0 && ay == 0.0 {
            return false;
        }
        let (min_a, max_a) = project(a.vertices(), ax, ay);
        let (min_b, max_b) = project(b.vertices(), ax, ay);
        max_a < min_b || max_b < min_a
    })
}

/// Separating axis test for two convex polygons. Touching counts as
/// overlap, and so does containment.
pub fn convex_polygons_intersect(a: &Polygon, b: &Polygon) -> bool {
    debug_assert!(a.is_convex() && b.is_convex());
    !separated_along_edges_of(a, a, b) && !separated_along_edges_of(b, a, b)
}
