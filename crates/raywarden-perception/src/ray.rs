//! [`Ray`] – a directed half-line emitted from a particle at a fixed angle.
//!
//! The intersection test solves the two-line parametric system with
//! Cramer's rule:
//!
//! ```text
//! segment:  P(t) = a + t (b - a)
//! ray:      R(u) = o + u d
//! ```
//!
//! A hit requires `0 < t < 1` (strictly inside the segment, endpoints
//! excluded) and `u > 0` (strictly ahead of the origin). A zero determinant
//! means the lines are parallel and never intersect.
//!
//! # Example
//!
//! ```rust
//! use raywarden_perception::ray::Ray;
//! use raywarden_types::{LineSegment, Point};
//!
//! let ray = Ray::new(0);
//! let wall = LineSegment::new(Point::new(5.0, -5.0), Point::new(5.0, 5.0), "wall");
//! let hit = ray.cast(Point::new(0.0, 0.0), &wall).unwrap();
//! assert!((hit.x - 5.0).abs() < 1e-9 && hit.y.abs() < 1e-9);
//! ```

use raywarden_types::{LineSegment, Point};

/// A ray with a fixed angle and a precomputed unit direction vector.
///
/// The ray holds no origin; callers pass the particle's current position to
/// [`cast`][Self::cast] so that every ray follows the particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    angle: u16,
    dir: Point,
}

impl Ray {
    /// Create a ray pointing `angle` degrees counter-clockwise from +X.
    pub fn new(angle: u16) -> Self {
        let rad = f64::from(angle).to_radians();
        Self {
            angle,
            dir: Point::new(rad.cos(), rad.sin()),
        }
    }

    /// Emission angle in whole degrees.
    pub fn angle(&self) -> u16 {
        self.angle
    }

    /// Unit direction vector.
    pub fn direction(&self) -> Point {
        self.dir
    }

    /// Intersect this ray, emitted from `origin`, with `segment`.
    ///
    /// Returns the contact point, or `None` when the lines are parallel, the
    /// contact lies on or outside the segment's endpoints, or the contact is
    /// at or behind the origin.
    pub fn cast(&self, origin: Point, segment: &LineSegment) -> Option<Point> {
        let (x1, y1) = (segment.a.x, segment.a.y);
        let (x2, y2) = (segment.b.x, segment.b.y);
        let (x3, y3) = (origin.x, origin.y);
        let (x4, y4) = (origin.x + self.dir.x, origin.y + self.dir.y);

        let den = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
        if den == 0.0 {
            return None;
        }

        let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / den;
        let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / den;

        if t > 0.0 && t < 1.0 && u > 0.0 {
            Some(Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> LineSegment {
        LineSegment::new(Point::new(ax, ay), Point::new(bx, by), "test")
    }

    const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    #[test]
    fn direction_is_unit_length() {
        for angle in [0, 45, 90, 137, 270, 359] {
            let d = Ray::new(angle).direction();
            assert!(((d.x * d.x + d.y * d.y) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn hits_segment_straight_ahead() {
        let hit = Ray::new(0).cast(ORIGIN, &seg(5.0, -5.0, 5.0, 5.0)).expect("hit");
        assert!((hit.x - 5.0).abs() < 1e-12);
        assert!(hit.y.abs() < 1e-12);
    }

    #[test]
    fn hit_follows_origin() {
        let hit = Ray::new(0)
            .cast(Point::new(2.0, 1.0), &seg(5.0, -5.0, 5.0, 5.0))
            .expect("hit");
        assert!((hit.x - 5.0).abs() < 1e-12);
        assert!((hit.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn segment_start_point_contact_is_a_miss() {
        // t == 0
        assert!(Ray::new(0).cast(ORIGIN, &seg(5.0, 0.0, 5.0, 5.0)).is_none());
    }

    #[test]
    fn segment_end_point_contact_is_a_miss() {
        // t == 1
        assert!(Ray::new(0).cast(ORIGIN, &seg(5.0, -5.0, 5.0, 0.0)).is_none());
    }

    #[test]
    fn segment_behind_origin_is_a_miss() {
        assert!(Ray::new(0).cast(ORIGIN, &seg(-5.0, -5.0, -5.0, 5.0)).is_none());
    }

    #[test]
    fn parallel_segment_is_a_miss() {
        assert!(Ray::new(0).cast(ORIGIN, &seg(0.0, 1.0, 5.0, 1.0)).is_none());
    }

    #[test]
    fn zero_length_segment_is_a_miss() {
        assert!(Ray::new(0).cast(ORIGIN, &seg(5.0, 0.0, 5.0, 0.0)).is_none());
    }

    #[test]
    fn segment_beyond_its_extent_is_a_miss() {
        // Line x = 5 is ahead, but the segment only spans y in [1, 5].
        assert!(Ray::new(0).cast(ORIGIN, &seg(5.0, 1.0, 5.0, 5.0)).is_none());
    }

    #[test]
    fn contact_through_origin_is_a_miss() {
        // u == 0: the segment crosses the ray's origin.
        assert!(Ray::new(0).cast(ORIGIN, &seg(0.0, -1.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn ninety_degree_ray_hits_ceiling() {
        let hit = Ray::new(90).cast(ORIGIN, &seg(-1.0, 3.0, 1.0, 3.0)).expect("hit");
        assert!(hit.x.abs() < 1e-9);
        assert!((hit.y - 3.0).abs() < 1e-12);
    }
}
