//! Planar geometry for map-view grid work
//!
//! Everything here operates on open rings (no repeated closing vertex) of
//! `Vec2` vertices. The grid is built from axis-aligned quadtree cells, so the
//! clipping routines only need a convex rectangular window.

use super::vec3::Vec2;
use serde::{Deserialize, Serialize};

/// Absolute tolerance for coordinate comparisons (model length units)
pub const EPSILON: f64 = 1e-9;

#[inline]
fn cross(o: &Vec2, a: &Vec2, b: &Vec2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Sign of the turn o → a → b: 1 = counter-clockwise, -1 = clockwise, 0 = collinear
fn orientation(o: &Vec2, a: &Vec2, b: &Vec2) -> i8 {
    let v = cross(o, a, b);
    let scale = ((a - o).norm() * (b - o).norm()).max(1.0);
    if v.abs() <= EPSILON * scale {
        0
    } else if v > 0.0 {
        1
    } else {
        -1
    }
}

/// Drop a repeated closing vertex so `[a, b, c, a]` becomes `[a, b, c]`
pub fn open_ring(ring: &[Vec2]) -> Vec<Vec2> {
    let mut out = ring.to_vec();
    if out.len() > 1 && (out[0] - out[out.len() - 1]).norm() <= EPSILON {
        out.pop();
    }
    out
}

/// Shoelace area, positive for counter-clockwise rings
pub fn signed_area(ring: &[Vec2]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Where a point sits relative to a polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    OnBoundary,
    Outside,
}

/// Is `p` within `tol` of the closed segment a–b?
pub fn on_segment(p: &Vec2, a: &Vec2, b: &Vec2, tol: f64) -> bool {
    let ab = b - a;
    let len = ab.norm();
    if len <= tol {
        return (p - a).norm() <= tol;
    }
    if cross(a, b, p).abs() / len > tol {
        return false;
    }
    let t = (p - a).dot(&ab) / (len * len);
    let slack = tol / len;
    (-slack..=1.0 + slack).contains(&t)
}

/// Closed point-in-polygon test that reports boundary hits separately
pub fn locate_point(ring: &[Vec2], p: &Vec2, tol: f64) -> PointLocation {
    let n = ring.len();
    if n < 3 {
        return PointLocation::Outside;
    }
    for i in 0..n {
        if on_segment(p, &ring[i], &ring[(i + 1) % n], tol) {
            return PointLocation::OnBoundary;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&ring[i], &ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    if inside {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

/// Closed segment intersection (touching and collinear overlap count)
pub fn segments_intersect(a: &Vec2, b: &Vec2, c: &Vec2, d: &Vec2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 {
        return true;
    }

    (o1 == 0 && on_segment(c, a, b, EPSILON))
        || (o2 == 0 && on_segment(d, a, b, EPSILON))
        || (o3 == 0 && on_segment(a, c, d, EPSILON))
        || (o4 == 0 && on_segment(b, c, d, EPSILON))
}

/// Strict crossing: the segments meet at a single point interior to both
pub fn segments_cross(a: &Vec2, b: &Vec2, c: &Vec2, d: &Vec2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);
    o1 * o2 < 0 && o3 * o4 < 0
}

/// A ring is simple when no two non-adjacent edges touch, adjacent edges do
/// not fold back on each other, and no edge has zero length.
///
/// Collinear consecutive edges are allowed: quadtree cells carry hanging
/// vertices along their sides.
pub fn is_simple(ring: &[Vec2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        let c = &ring[(i + 2) % n];
        if (b - a).norm() <= EPSILON {
            return false;
        }
        // b is shared by edges a-b and b-c; folding back means c lies on a-b
        if orientation(a, b, c) == 0 && (a - b).dot(&(c - b)) > 0.0 {
            return false;
        }
    }

    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let c = &ring[j];
            let d = &ring[(j + 1) % n];
            if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }

    true
}

/// Does `outer` contain `inner` (boundary contact allowed)?
pub fn polygon_contains(outer: &[Vec2], inner: &[Vec2], tol: f64) -> bool {
    let n = inner.len();
    for i in 0..n {
        let a = &inner[i];
        let b = &inner[(i + 1) % n];
        let mid = (a + b) * 0.5;
        if locate_point(outer, a, tol) == PointLocation::Outside
            || locate_point(outer, &mid, tol) == PointLocation::Outside
        {
            return false;
        }
    }

    let m = outer.len();
    for i in 0..n {
        for j in 0..m {
            if segments_cross(
                &inner[i],
                &inner[(i + 1) % n],
                &outer[j],
                &outer[(j + 1) % m],
            ) {
                return false;
            }
        }
    }
    true
}

/// Axis-aligned rectangle (cell footprint, grid extent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Closed containment test
    pub fn contains(&self, p: &Vec2, tol: f64) -> bool {
        p.x >= self.min.x - tol
            && p.x <= self.max.x + tol
            && p.y >= self.min.y - tol
            && p.y <= self.max.y + tol
    }

    /// Rectangles share a closed region (edge contact counts)
    pub fn touches(&self, other: &Rect, tol: f64) -> bool {
        self.min.x <= other.max.x + tol
            && other.min.x <= self.max.x + tol
            && self.min.y <= other.max.y + tol
            && other.min.y <= self.max.y + tol
    }

    /// Sutherland–Hodgman clip of an arbitrary ring against this rectangle
    pub fn clip_polygon(&self, polygon: &[Vec2]) -> Vec<Vec2> {
        let (x0, x1, y0, y1) = (self.min.x, self.max.x, self.min.y, self.max.y);

        let at_x = |p: &Vec2, q: &Vec2, x: f64| {
            let t = (x - p.x) / (q.x - p.x);
            Vec2::new(x, p.y + (q.y - p.y) * t)
        };
        let at_y = |p: &Vec2, q: &Vec2, y: f64| {
            let t = (y - p.y) / (q.y - p.y);
            Vec2::new(p.x + (q.x - p.x) * t, y)
        };

        let out = clip_against(polygon, |p| p.x >= x0, |p, q| at_x(p, q, x0));
        let out = clip_against(&out, |p| p.x <= x1, |p, q| at_x(p, q, x1));
        let out = clip_against(&out, |p| p.y >= y0, |p, q| at_y(p, q, y0));
        clip_against(&out, |p| p.y <= y1, |p, q| at_y(p, q, y1))
    }

    /// Area of the polygon that falls inside this rectangle
    pub fn overlap_area(&self, polygon: &[Vec2]) -> f64 {
        signed_area(&self.clip_polygon(polygon)).abs()
    }

    /// Liang–Barsky clip of segment a–b; returns the parameter range inside
    pub fn clip_segment(&self, a: &Vec2, b: &Vec2) -> Option<(f64, f64)> {
        let d = b - a;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let checks = [
            (-d.x, a.x - self.min.x),
            (d.x, self.max.x - a.x),
            (-d.y, a.y - self.min.y),
            (d.y, self.max.y - a.y),
        ];

        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return None;
                    }
                    t0 = t0.max(r);
                } else {
                    if r < t0 {
                        return None;
                    }
                    t1 = t1.min(r);
                }
            }
        }
        Some((t0, t1))
    }

    /// Corner ring, counter-clockwise from the south-west corner
    pub fn ring(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

fn clip_against<I, X>(polygon: &[Vec2], inside: I, intersect: X) -> Vec<Vec2>
where
    I: Fn(&Vec2) -> bool,
    X: Fn(&Vec2, &Vec2) -> Vec2,
{
    let mut out = Vec::with_capacity(polygon.len() + 4);
    let Some(&last) = polygon.last() else {
        return out;
    };

    let mut prev = last;
    for &cur in polygon {
        match (inside(&prev), inside(&cur)) {
            (true, true) => out.push(cur),
            (true, false) => out.push(intersect(&prev, &cur)),
            (false, true) => {
                out.push(intersect(&prev, &cur));
                out.push(cur);
            }
            (false, false) => {}
        }
        prev = cur;
    }
    out
}
