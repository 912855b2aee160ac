// THEORY:
// The `geometry` module holds the handful of planar measurements the engine
// needs on top of the raster primitives: the axis-aligned bounding box of a
// contour, its polygon area and closed arc length, and the minimum enclosing
// circle of an arbitrary point set. The enclosing circle is what the
// annotation layer draws around each group, so it must be order-independent:
// the same set of points always yields the same circle regardless of which
// region contributed them first.

use imageproc::point::Point;

/// A closed polygon boundary traced around one connected blob of difference pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::of_points(&self.points)
    }

    /// Polygon area by the shoelace formula. Always `>= 0`.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Closed arc length of the boundary.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        imageproc::geometry::arc_length(&self.points, true)
    }
}

/// Integer axis-aligned box, inclusive of the extreme pixels (`width = max_x - min_x + 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn of_points(points: &[Point<i32>]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }

    /// Top-left plus half extents, truncating.
    pub fn center(&self) -> (i32, i32) {
        (self.x + (self.width / 2) as i32, self.y + (self.height / 2) as i32)
    }

    /// Intersects the box with `[0, width) x [0, height)`. Returns `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width as i32).min(width as i32);
        let y1 = (self.y + self.height as i32).min(height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(BoundingBox {
            x: x0,
            y: y0,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

/// A circle in continuous image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
}

const CONTAINMENT_EPSILON: f64 = 1e-7;

impl Circle {
    fn around(p: (f64, f64)) -> Self {
        Self { center: p, radius: 0.0 }
    }

    fn from_diameter(a: (f64, f64), b: (f64, f64)) -> Self {
        let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        Self {
            center,
            radius: distance(a, b) / 2.0,
        }
    }

    /// Circumcircle of three points; falls back to the widest pair when they are collinear.
    fn through(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Self {
        let (bx, by) = (b.0 - a.0, b.1 - a.1);
        let (cx, cy) = (c.0 - a.0, c.1 - a.1);
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < f64::EPSILON {
            let candidates = [Self::from_diameter(a, b), Self::from_diameter(a, c), Self::from_diameter(b, c)];
            return candidates
                .into_iter()
                .fold(Self::around(a), |best, c| if c.radius > best.radius { c } else { best });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let center = (a.0 + ux, a.1 + uy);
        Self {
            center,
            radius: distance(center, a),
        }
    }

    pub fn contains(&self, p: (f64, f64)) -> bool {
        distance(self.center, p) <= self.radius + CONTAINMENT_EPSILON * self.radius.max(1.0)
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Smallest circle containing every point. `None` for an empty set.
///
/// Only the convex hull can touch the optimal circle, so the incremental
/// (Welzl-style) construction runs over hull vertices in a fixed order, which
/// keeps the result deterministic.
pub fn min_enclosing_circle(points: &[Point<i32>]) -> Option<Circle> {
    if points.is_empty() {
        return None;
    }
    let mut hull = if points.len() > 3 {
        imageproc::geometry::convex_hull(points)
    } else {
        points.to_vec()
    };
    if hull.is_empty() {
        hull = points.to_vec();
    }
    let pts: Vec<(f64, f64)> = hull.iter().map(|p| (p.x as f64, p.y as f64)).collect();

    let mut circle = Circle::around(pts[0]);
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle::around(pts[i]);
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_diameter(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = Circle::through(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    Some(circle)
}
