//! [`Particle`] – a tracked worker modelled as a point carrying 360 rays.
//!
//! Ranging casts every ray against every scene segment and keeps the nearest
//! hit per ray. Ties keep the first segment encountered: a later segment
//! replaces the current best only when it is strictly closer.
//!
//! Until a position is known (first personnel telemetry) ranging returns an
//! empty result, which leaves collision detection inert.
//!
//! # Example
//!
//! ```rust
//! use raywarden_perception::particle::Particle;
//! use raywarden_types::{LineSegment, Point};
//!
//! let mut p = Particle::new("worker_1");
//! assert!(p.look(&[]).is_empty());
//!
//! p.set_position(0.0, 0.0);
//! let wall = LineSegment::new(Point::new(5.0, -5.0), Point::new(5.0, 5.0), "wall");
//! let views = p.look(&[wall]);
//! assert_eq!(views.len(), 360);
//! assert_eq!(views[0].obstacle.as_deref(), Some("wall"));
//! ```

use raywarden_types::{LineSegment, Point, RangingEntry};
use tracing::debug;

use crate::ray::Ray;

/// Number of rays cast per particle (1° resolution).
pub const RAY_COUNT: u16 = 360;

#[derive(Debug, Clone)]
pub struct Particle {
    id: String,
    position: Option<Point>,
    rays: Vec<Ray>,
}

impl Particle {
    /// Create a particle with an unknown position.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            rays: (0..RAY_COUNT).map(Ray::new).collect(),
        }
    }

    /// Create a particle at a known position.
    pub fn at(id: impl Into<String>, position: Point) -> Self {
        let mut particle = Self::new(id);
        particle.position = Some(position);
        particle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    /// Move the particle. Non-finite coordinates are ignored.
    pub fn set_position(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.position = Some(Point::new(x, y));
        } else {
            debug!(particle = %self.id, x, y, "ignoring non-finite position");
        }
    }

    /// Range all 360 rays against `segments`.
    ///
    /// Returns one entry per ray, or an empty vector when the position is
    /// unknown.
    pub fn look(&self, segments: &[LineSegment]) -> Vec<RangingEntry> {
        let Some(origin) = self.position else {
            return Vec::new();
        };
        self.rays
            .iter()
            .map(|ray| nearest_hit(ray, origin, segments))
            .collect()
    }

    /// Range only the rays whose angle lies in `start..=stop` degrees.
    pub fn look_between(&self, segments: &[LineSegment], start: u16, stop: u16) -> Vec<RangingEntry> {
        let Some(origin) = self.position else {
            return Vec::new();
        };
        self.rays
            .iter()
            .filter(|ray| (start..=stop).contains(&ray.angle()))
            .map(|ray| nearest_hit(ray, origin, segments))
            .collect()
    }
}

fn nearest_hit(ray: &Ray, origin: Point, segments: &[LineSegment]) -> RangingEntry {
    let mut best: Option<(&LineSegment, f64, Point)> = None;
    for segment in segments {
        let Some(contact) = ray.cast(origin, segment) else {
            continue;
        };
        let distance = origin.distance_to(contact);
        match best {
            Some((_, closest, _)) if distance >= closest => {}
            _ => best = Some((segment, distance, contact)),
        }
    }
    match best {
        Some((segment, distance, contact)) => RangingEntry {
            angle: ray.angle(),
            obstacle: Some(segment.description.clone()),
            distance: Some(distance),
            contact_point: Some(contact),
        },
        None => RangingEntry::miss(ray.angle()),
    }
}
