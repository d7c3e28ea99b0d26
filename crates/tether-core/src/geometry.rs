//! Geometry kernel: vector helpers, intersections and bend/arc conversion.
//!
//! Everything here is a pure function over kurbo primitives.

use crate::error::{EngineResult, invariant};
use kurbo::{Point, Rect, Vec2};
use std::f64::consts::{PI, TAU};

/// Tolerance used by [`approximately`].
pub const APPROX_EPSILON: f64 = 1e-6;

/// Epsilon-tolerant float comparison.
pub fn approximately(a: f64, b: f64) -> bool {
    (a - b).abs() < APPROX_EPSILON
}

/// Epsilon-tolerant point comparison.
pub fn approximately_point(a: Point, b: Point) -> bool {
    approximately(a.x, b.x) && approximately(a.y, b.y)
}

/// Linear interpolation between two scalars.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Perpendicular of a vector (rotated a quarter turn, `(-y, x)`).
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Unit vector in the direction of `v`, or `v` itself when it has no length.
pub fn unit(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len < f64::EPSILON { v } else { v / len }
}

/// Midpoint of two points.
pub fn midpoint(a: Point, b: Point) -> Point {
    a.midpoint(b)
}

/// Nearest point to `p` on segment `a`-`b`.
pub fn nearest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    a + seg * t
}

/// Nearest point to `p` on the infinite line through `a` and `b`.
pub fn nearest_point_on_line(a: Point, b: Point, p: Point) -> Point {
    let dir = unit(b - a);
    a + dir * (p - a).dot(dir)
}

/// Whether `a`, `b`, `c` wind clockwise in screen space (y down).
pub fn is_clockwise(a: Point, b: Point, c: Point) -> bool {
    (c.x - a.x) * (b.y - a.y) - (b.x - a.x) * (c.y - a.y) < 0.0
}

/// Axis-aligned bounds of a point cloud. Empty input yields `Rect::ZERO`.
pub fn bounds_of(points: impl IntoIterator<Item = Point>) -> Rect {
    let mut iter = points.into_iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(p))
}

/// Whether `outer` fully contains `inner` (edges inclusive).
pub fn rect_contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Even-odd point in polygon test.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let mut inside = false;
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Segments of an outline, closing it back to the first vertex when `closed`.
pub fn outline_segments(vertices: &[Point], closed: bool) -> Vec<(Point, Point)> {
    let mut segments: Vec<(Point, Point)> = vertices.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && vertices.len() > 2 {
        segments.push((vertices[vertices.len() - 1], vertices[0]));
    }
    segments
}

/// Intersection of segment `p1`-`p2` with the circle at `center`.
///
/// Returns zero, one or two points ordered along the segment.
pub fn intersect_segment_circle(p1: Point, p2: Point, center: Point, radius: f64) -> Vec<Point> {
    let d = p2 - p1;
    let f = p1 - center;
    let a = d.hypot2();
    if a < f64::EPSILON {
        return Vec::new();
    }
    let b = 2.0 * f.dot(d);
    let c = f.hypot2() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);
    let mut out = Vec::with_capacity(2);
    for t in [t1, t2] {
        if (0.0..=1.0).contains(&t) {
            let p = p1 + d * t;
            if !out.iter().any(|q: &Point| approximately_point(*q, p)) {
                out.push(p);
            }
        }
    }
    out
}

/// Intersection point of segments `a1`-`a2` and `b1`-`b2`, if any.
pub fn intersect_segment_segment(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<Point> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.cross(s);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let qp = b1 - a1;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1 + r * t)
    } else {
        None
    }
}

/// All intersections of segment `a`-`b` with an outline.
pub fn intersect_segment_outline(a: Point, b: Point, vertices: &[Point], closed: bool) -> Vec<Point> {
    outline_segments(vertices, closed)
        .into_iter()
        .filter_map(|(p, q)| intersect_segment_segment(a, b, p, q))
        .collect()
}

/// All intersections of a circle with an outline.
pub fn intersect_circle_outline(
    center: Point,
    radius: f64,
    vertices: &[Point],
    closed: bool,
) -> Vec<Point> {
    outline_segments(vertices, closed)
        .into_iter()
        .flat_map(|(p, q)| intersect_segment_circle(p, q, center, radius))
        .collect()
}

/// A circular arc running from `start_angle` through `sweep` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcInfo {
    pub center: Point,
    pub radius: f64,
    pub start_angle: f64,
    /// Signed sweep; positive runs with increasing angle.
    pub sweep: f64,
    /// Arc length, always non-negative.
    pub length: f64,
    pub large_arc_flag: bool,
    pub sweep_flag: bool,
}

impl ArcInfo {
    fn from_parts(center: Point, radius: f64, start_angle: f64, sweep: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            sweep,
            length: sweep.abs() * radius,
            large_arc_flag: sweep.abs() > PI,
            sweep_flag: sweep > 0.0,
        }
    }

    /// Point at fraction `t` (0 = start, 1 = end) along the arc.
    pub fn point_at(&self, t: f64) -> Point {
        let angle = self.start_angle + self.sweep * t;
        self.center + Vec2::from_angle(angle) * self.radius
    }

    pub fn start(&self) -> Point {
        self.point_at(0.0)
    }

    pub fn end(&self) -> Point {
        self.point_at(1.0)
    }

    /// Fraction along the arc of a point lying on its circle, if it falls
    /// within the swept range.
    pub fn fraction_of(&self, point: Point) -> Option<f64> {
        if self.sweep.abs() < f64::EPSILON {
            return None;
        }
        let angle = (point - self.center).atan2();
        let delta = if self.sweep > 0.0 {
            (angle - self.start_angle).rem_euclid(TAU)
        } else {
            (self.start_angle - angle).rem_euclid(TAU)
        };
        let t = delta / self.sweep.abs();
        (t <= 1.0 + APPROX_EPSILON).then_some(t.min(1.0))
    }

    /// The portion of this arc between fractions `t0` and `t1`.
    pub fn sub_arc(&self, t0: f64, t1: f64) -> ArcInfo {
        ArcInfo::from_parts(
            self.center,
            self.radius,
            self.start_angle + self.sweep * t0,
            self.sweep * (t1 - t0),
        )
    }

    pub fn to_kurbo(&self) -> kurbo::Arc {
        kurbo::Arc {
            center: self.center,
            radii: Vec2::new(self.radius, self.radius),
            start_angle: self.start_angle,
            sweep_angle: self.sweep,
            x_rotation: 0.0,
        }
    }
}

/// Arc through three points, running from `a` through `b` to `c`.
///
/// Returns `None` when the points are collinear or coincident.
pub fn arc_through(a: Point, b: Point, c: Point) -> Option<ArcInfo> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < APPROX_EPSILON {
        return None;
    }
    let a2 = a.to_vec2().hypot2();
    let b2 = b.to_vec2().hypot2();
    let c2 = c.to_vec2().hypot2();
    let center = Point::new(
        (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
        (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
    );
    let radius = center.distance(a);
    let start_angle = (a - center).atan2();
    let end_angle = (c - center).atan2();
    // (b - a) x (c - a) > 0 means a -> b -> c runs with increasing angle.
    let sweep = if (b - a).cross(c - a) > 0.0 {
        (end_angle - start_angle).rem_euclid(TAU)
    } else {
        -(start_angle - end_angle).rem_euclid(TAU)
    };
    Some(ArcInfo::from_parts(center, radius, start_angle, sweep))
}

/// The point a bend places off the chord: the chord midpoint pushed along the
/// chord's perpendicular by `bend`.
pub fn bend_middle(start: Point, end: Point, bend: f64) -> Point {
    midpoint(start, end) + perpendicular(unit(end - start)) * bend
}

/// Arc described by a chord and a bend offset.
pub fn bend_to_arc(start: Point, end: Point, bend: f64) -> Option<ArcInfo> {
    arc_through(start, bend_middle(start, end, bend), end)
}

/// Recover the bend for a new chord from the arc the previous chord lay on.
///
/// The new chord's perpendicular bisector is walked in the direction of the
/// old bend's sign until it leaves the old circle. A chord whose endpoints lie
/// on the old circle always produces exactly one such exit; anything else is
/// an invariant violation.
pub fn arc_to_bend(arc: &ArcInfo, new_start: Point, new_end: Point, bend: f64) -> EngineResult<f64> {
    let sign = if bend < 0.0 { -1.0 } else { 1.0 };
    let mid = midpoint(new_start, new_end);
    let reach = unit(perpendicular(new_end - new_start)) * (arc.radius * 2.0 * sign);
    let hits = intersect_segment_circle(mid, mid + reach, arc.center, arc.radius);
    match hits.as_slice() {
        [hit] => Ok(mid.distance(*hit) * sign),
        _ => Err(invariant(format!(
            "expected one arc intersection when re-bending, found {}",
            hits.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert!((lerp(0.0, 10.0, 0.25) - 2.5).abs() < f64::EPSILON);
        assert!((lerp(4.0, 4.0, 0.9) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nearest_point_on_segment_clamps() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let p = nearest_point_on_segment(a, b, Point::new(5.0, 3.0));
        assert!(approximately_point(p, Point::new(5.0, 0.0)));
        let p = nearest_point_on_segment(a, b, Point::new(15.0, 3.0));
        assert!(approximately_point(p, b));
    }

    #[test]
    fn test_nearest_point_on_line_extends() {
        let p = nearest_point_on_line(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(15.0, 3.0),
        );
        assert!(approximately_point(p, Point::new(15.0, 0.0)));
    }

    #[test]
    fn test_segment_circle_intersection_counts() {
        let center = Point::new(0.0, 0.0);
        // Through the circle: two hits.
        let hits = intersect_segment_circle(Point::new(-20.0, 0.0), Point::new(20.0, 0.0), center, 10.0);
        assert_eq!(hits.len(), 2);
        assert!(approximately_point(hits[0], Point::new(-10.0, 0.0)));
        // From inside to outside: one hit.
        let hits = intersect_segment_circle(Point::new(0.0, 0.0), Point::new(20.0, 0.0), center, 10.0);
        assert_eq!(hits.len(), 1);
        assert!(approximately_point(hits[0], Point::new(10.0, 0.0)));
        // Missing entirely.
        let hits = intersect_segment_circle(Point::new(-20.0, 15.0), Point::new(20.0, 15.0), center, 10.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_segment_segment_intersection() {
        let hit = intersect_segment_segment(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert!(approximately_point(hit.unwrap(), Point::new(5.0, 5.0)));
        let parallel = intersect_segment_segment(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(10.0, 1.0),
        );
        assert!(parallel.is_none());
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square));
    }

    #[test]
    fn test_arc_through_semicircle() {
        let arc = arc_through(Point::new(-10.0, 0.0), Point::new(0.0, 10.0), Point::new(10.0, 0.0)).unwrap();
        assert!(approximately_point(arc.center, Point::ZERO));
        assert!(approximately(arc.radius, 10.0));
        assert!(approximately(arc.sweep.abs(), PI));
        assert!(approximately(arc.length, PI * 10.0));
        assert!(approximately_point(arc.point_at(0.5), Point::new(0.0, 10.0)));
        assert!(approximately_point(arc.end(), Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_arc_through_collinear_is_none() {
        assert!(arc_through(Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)).is_none());
    }

    #[test]
    fn test_bend_to_arc_passes_through_middle() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(100.0, 0.0);
        let arc = bend_to_arc(start, end, 20.0).unwrap();
        assert!(approximately_point(arc.point_at(0.5), Point::new(50.0, 20.0)));
        assert!(approximately_point(arc.start(), start));
        assert!(approximately_point(arc.end(), end));
    }

    #[test]
    fn test_fraction_of_point_on_arc() {
        let arc = bend_to_arc(Point::new(0.0, 0.0), Point::new(100.0, 0.0), -30.0).unwrap();
        let p = arc.point_at(0.3);
        assert!((arc.fraction_of(p).unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_arc_to_bend_same_chord_is_identity() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(100.0, 0.0);
        for bend in [25.0, -25.0, 80.0] {
            let arc = bend_to_arc(start, end, bend).unwrap();
            let recovered = arc_to_bend(&arc, start, end, bend).unwrap();
            assert!((recovered - bend).abs() < 1e-9, "bend {bend} recovered as {recovered}");
        }
    }

    #[test]
    fn test_bend_round_trip_after_terminal_move() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(120.0, 40.0);
        let bend = 35.0;
        let original = bend_to_arc(start, end, bend).unwrap();

        // Slide the end terminal along the arc, then back.
        let moved_end = original.point_at(0.8);
        let moved_bend = arc_to_bend(&original, start, moved_end, bend).unwrap();
        let moved = bend_to_arc(start, moved_end, moved_bend).unwrap();
        let restored = arc_to_bend(&moved, start, end, moved_bend).unwrap();

        assert!((restored - bend).abs() < 1e-6);
    }

    #[test]
    fn test_rect_contains_rect() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(rect_contains_rect(outer, Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!rect_contains_rect(outer, Rect::new(90.0, 90.0, 120.0, 95.0)));
    }

    #[test]
    fn test_bounds_of_empty() {
        assert_eq!(bounds_of(Vec::new()), Rect::ZERO);
    }
}
