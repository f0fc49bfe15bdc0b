use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Length tolerance in board units (millimetres).
pub const EPSILON: f64 = 1e-9;

/// Maximum miter distance as a multiple of `|distance|` in [`offset_polygon`].
const MITER_LIMIT: f64 = 4.0;

/// A 2D point in board coordinates (millimetres). Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Rotate about the frame origin, counter-clockwise positive (radians).
    pub fn rotate(&self, angle: f64) -> Self {
        if angle == 0.0 {
            return *self;
        }
        let (sin_a, cos_a) = angle.sin_cos();
        Self {
            x: self.x * cos_a - self.y * sin_a,
            y: self.x * sin_a + self.y * cos_a,
        }
    }

    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero vector.
    pub fn normalized(&self) -> Option<Point> {
        let len = self.length();
        if len < EPSILON {
            None
        } else {
            Some(Point::new(self.x / len, self.y / len))
        }
    }

    pub fn lerp(&self, other: Point, t: f64) -> Point {
        *self + (other - *self) * t
    }
}

impl From<[f64; 2]> for Point {
    fn from(v: [f64; 2]) -> Self {
        Point::new(v[0], v[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
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
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min: self.min.translate(-margin, -margin),
            max: self.max.translate(margin, margin),
        }
    }
}

/// A closed polygon. The last point connects back to the first; the point
/// order defines winding and edge adjacency. Serialized as `[[x, y], ...]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, wound counter-clockwise.
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        Self::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.points)
    }

    /// Edges as `(start, end)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn transform(&self, origin: Point, rotation: f64) -> Polygon {
        transform(self, origin, rotation)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Polygon {
        Polygon::new(self.points.iter().map(|p| p.translate(dx, dy)).collect())
    }

    /// Even-odd containment test.
    pub fn contains_point(&self, p: &Point) -> bool {
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

    /// True when no two edges cross or touch except consecutive edges at
    /// their shared vertex.
    pub fn is_simple(&self) -> bool {
        let pts = &self.points;
        let n = pts.len();
        if n < 3 {
            return false;
        }
        if (0..n).any(|i| pts[i].distance_to(&pts[(i + 1) % n]) < EPSILON) {
            return false;
        }
        for i in 0..n {
            let (a1, a2) = (pts[i], pts[(i + 1) % n]);
            for j in (i + 1)..n {
                let (b1, b2) = (pts[j], pts[(j + 1) % n]);
                if j == i + 1 {
                    if folds_back(a1, a2, b2) {
                        return false;
                    }
                } else if i == 0 && j == n - 1 {
                    if folds_back(b1, a1, a2) {
                        return false;
                    }
                } else if segments_intersect(a1, a2, b1, b2) {
                    return false;
                }
            }
        }
        true
    }

    /// Check the electrode polygon invariant: at least 3 points, no
    /// self-intersection, non-zero area. A polygon with every vertex on one
    /// line is degenerate rather than self-intersecting.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.points.len() < 3 {
            return Err(GeometryError::TooFewPoints {
                count: self.points.len(),
            });
        }
        if self.is_colinear() {
            return Err(GeometryError::Degenerate("zero area".into()));
        }
        if !self.is_simple() {
            return Err(GeometryError::SelfIntersecting);
        }
        if self.area() < EPSILON {
            return Err(GeometryError::Degenerate("zero area".into()));
        }
        Ok(())
    }

    fn is_colinear(&self) -> bool {
        let pts = &self.points;
        pts.windows(2)
            .skip(1)
            .all(|w| orientation(pts[0], w[0], w[1]).abs() < EPSILON)
    }
}

/// Rotate every point about the local origin by `rotation` radians, then
/// translate by `origin`.
pub fn transform(polygon: &Polygon, origin: Point, rotation: f64) -> Polygon {
    Polygon::new(
        polygon
            .points
            .iter()
            .map(|p| p.rotate(rotation) + origin)
            .collect(),
    )
}

/// Shoelace area. Positive for counter-clockwise, negative for clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Move every edge along its outward normal by `distance` (negative shrinks).
///
/// Vertex count and winding are preserved. Miter joins are clamped to
/// `MITER_LIMIT * |distance|`, and an edge that would invert is collapsed
/// to its midpoint. A result that loses its area is reported as
/// [`GeometryError::Degenerate`].
pub fn offset_polygon(polygon: &Polygon, distance: f64) -> Result<Polygon, GeometryError> {
    let pts = &polygon.points;
    let n = pts.len();
    if n < 3 {
        return Err(GeometryError::TooFewPoints { count: n });
    }
    let area = signed_area(pts);
    if area.abs() < EPSILON {
        return Err(GeometryError::Degenerate("zero area".into()));
    }
    if distance.abs() < EPSILON {
        return Ok(polygon.clone());
    }
    let orientation = area.signum();

    let mut dirs = Vec::with_capacity(n);
    let mut normals = Vec::with_capacity(n);
    for i in 0..n {
        let d = (pts[(i + 1) % n] - pts[i]).normalized().ok_or_else(|| {
            GeometryError::Degenerate(format!("zero-length edge at vertex {i}"))
        })?;
        dirs.push(d);
        normals.push(Point::new(d.y, -d.x) * orientation);
    }

    let limit = MITER_LIMIT * distance.abs();
    let mut out: Vec<Point> = (0..n)
        .map(|i| {
            let prev = normals[(i + n - 1) % n];
            let cur = normals[i];
            let denom = 1.0 + prev.dot(cur);
            let mut miter = if denom < EPSILON {
                cur * distance
            } else {
                (prev + cur) * (distance / denom)
            };
            let len = miter.length();
            if len > limit {
                log::debug!("offset miter at vertex {i} clamped from {len:.4}");
                miter = miter * (limit / len);
            }
            pts[i] + miter
        })
        .collect();

    let inverted: Vec<bool> = (0..n)
        .map(|i| (out[(i + 1) % n] - out[i]).dot(dirs[i]) < 0.0)
        .collect();
    if inverted.iter().filter(|&&flag| !flag).count() < 3 {
        return Err(GeometryError::Degenerate(format!(
            "offset by {distance} inverts the polygon"
        )));
    }
    for i in (0..n).filter(|&i| inverted[i]) {
        let j = (i + 1) % n;
        let mid = out[i].lerp(out[j], 0.5);
        out[i] = mid;
        out[j] = mid;
    }

    if signed_area(&out) * orientation <= EPSILON {
        return Err(GeometryError::Degenerate(format!(
            "offset by {distance} collapses the polygon"
        )));
    }
    Ok(Polygon::new(out))
}

/// Copper actually poured for an electrode: the polygon inset by half the
/// copper-to-copper clearance, so two abutting electrodes end up exactly
/// `clearance` apart.
pub fn clearance_outline(polygon: &Polygon, clearance: f64) -> Result<Polygon, GeometryError> {
    offset_polygon(polygon, -clearance / 2.0)
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

/// Consecutive edges `u -> v -> w` that double back onto each other.
fn folds_back(u: Point, v: Point, w: Point) -> bool {
    let e1 = v - u;
    let e2 = w - v;
    e1.cross(e2).abs() <= EPSILON * e1.length() * e2.length() && e1.dot(e2) < 0.0
}

/// Closed-segment intersection test (touching counts).
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    let straddles = |p: f64, q: f64| (p > EPSILON && q < -EPSILON) || (p < -EPSILON && q > EPSILON);
    if straddles(d1, d2) && straddles(d3, d4) {
        return true;
    }

    (d1.abs() <= EPSILON && on_segment(b1, b2, a1))
        || (d2.abs() <= EPSILON && on_segment(b1, b2, a2))
        || (d3.abs() <= EPSILON && on_segment(a1, a2, b1))
        || (d4.abs() <= EPSILON && on_segment(a1, a2, b2))
}

pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq < EPSILON * EPSILON {
        return p.distance_to(&a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&a.lerp(b, t))
}

/// Segment-to-segment minimum distance.
pub fn segment_distance(a1: Point, a2: Point, b1: Point, b2: Point) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    point_segment_distance(a1, b1, b2)
        .min(point_segment_distance(a2, b1, b2))
        .min(point_segment_distance(b1, a1, a2))
        .min(point_segment_distance(b2, a1, a2))
}

/// Minimum distance between two polygons; zero when they overlap.
pub fn polygon_distance(a: &Polygon, b: &Polygon) -> f64 {
    if let (Some(pa), Some(pb)) = (a.points.first(), b.points.first()) {
        if b.contains_point(pa) || a.contains_point(pb) {
            return 0.0;
        }
    }
    let mut min_d = f64::MAX;
    for (a1, a2) in a.edges() {
        for (b1, b2) in b.edges() {
            min_d = min_d.min(segment_distance(a1, a2, b1, b2));
            if min_d == 0.0 {
                return 0.0;
            }
        }
    }
    min_d
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, 5.0), Point::new(15.0, 15.0));
        let c = BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.expand(10.0).intersects(&c));
    }

    #[test]
    fn test_transform_rotates_then_translates() {
        let square = Polygon::rect(0.0, 0.0, 1.0, 1.0);
        let moved = transform(&square, Point::new(10.0, 0.0), FRAC_PI_2);
        // (1, 0) rotates onto (0, 1), then shifts by 10 in x
        assert!((moved.points[1].x - 10.0).abs() < 1e-12);
        assert!((moved.points[1].y - 1.0).abs() < 1e-12);
        assert_eq!(moved.len(), 4);
        assert!(moved.is_ccw());
    }

    #[test]
    fn test_transform_zero_rotation_is_exact() {
        let square = Polygon::rect(0.1, 0.2, 0.7, 0.9);
        let moved = square.transform(Point::new(0.0, 0.0), 0.0);
        assert_eq!(moved, square);
    }

    #[test]
    fn test_signed_area_winding() {
        let ccw = Polygon::rect(0.0, 0.0, 2.0, 1.0);
        assert!((ccw.signed_area() - 2.0).abs() < 1e-12);
        let mut cw = ccw.clone();
        cw.points.reverse();
        assert!((cw.signed_area() + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_shrinks_square() {
        let square = Polygon::rect(0.0, 0.0, 1.0, 1.0);
        let inner = offset_polygon(&square, -0.1).unwrap();
        assert_eq!(inner.len(), 4);
        assert!((inner.points[0].x - 0.1).abs() < 1e-12);
        assert!((inner.points[0].y - 0.1).abs() < 1e-12);
        assert!((inner.area() - 0.64).abs() < 1e-12);
        assert!(inner.is_ccw());
    }

    #[test]
    fn test_offset_grows_clockwise_square() {
        let mut square = Polygon::rect(0.0, 0.0, 1.0, 1.0);
        square.points.reverse();
        let outer = offset_polygon(&square, 0.5).unwrap();
        assert!((outer.area() - 4.0).abs() < 1e-12);
        assert!(!outer.is_ccw());
    }

    #[test]
    fn test_offset_too_far_fails_gracefully() {
        let square = Polygon::rect(0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            offset_polygon(&square, -0.6),
            Err(GeometryError::Degenerate(_))
        ));
    }

    #[test]
    fn test_offset_collapses_short_edge() {
        // A notch edge much shorter than the offset distance.
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(2.05, 4.0),
            Point::new(2.05, 4.2),
            Point::new(1.95, 4.2),
            Point::new(1.95, 4.0),
            Point::new(0.0, 4.0),
        ]);
        let inner = offset_polygon(&poly, -0.2).unwrap();
        assert_eq!(inner.len(), poly.len());
        assert!(inner.area() < poly.area());
    }

    #[test]
    fn test_is_simple() {
        assert!(Polygon::rect(0.0, 0.0, 1.0, 1.0).is_simple());
        let bowtie = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ]);
        assert!(!bowtie.is_simple());
        assert!(bowtie.area() < EPSILON);
        assert_eq!(bowtie.validate(), Err(GeometryError::SelfIntersecting));
    }

    #[test]
    fn test_validate_rejects_degenerate() {
        let line = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ]);
        assert!(matches!(line.validate(), Err(GeometryError::Degenerate(_))));
        let two = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        assert_eq!(two.validate(), Err(GeometryError::TooFewPoints { count: 2 }));
    }

    #[test]
    fn test_polygon_distance() {
        let a = Polygon::rect(0.0, 0.0, 1.0, 1.0);
        let b = Polygon::rect(1.5, 0.0, 2.5, 1.0);
        assert!((polygon_distance(&a, &b) - 0.5).abs() < 1e-12);
        let touching = Polygon::rect(1.0, 0.0, 2.0, 1.0);
        assert_eq!(polygon_distance(&a, &touching), 0.0);
        let inside = Polygon::rect(0.25, 0.25, 0.75, 0.75);
        assert_eq!(polygon_distance(&a, &inside), 0.0);
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(1.5, -2.0)).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
        let p: Point = serde_json::from_str("[3.0, 4.0]").unwrap();
        assert_eq!(p, Point::new(3.0, 4.0));
    }
}
