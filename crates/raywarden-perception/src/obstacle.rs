//! [`Obstacle`] – a named geometric entity decomposed into line segments.
//!
//! | Shape | Segments derived from `n` corner points |
//! |---|---|
//! | [`ObstacleShape::Polygon`] | `n`: each consecutive pair plus last → first |
//! | [`ObstacleShape::Line`] | `1`: first → second, extra points ignored |
//! | [`ObstacleShape::Unknown`] | `1`: zero-length, first → first |
//!
//! Segments are always rebuilt from scratch; there is no incremental
//! patching, so changing the shape never leaves stale segments behind.

use raywarden_types::{LineSegment, ObstacleKind, ObstacleShape, Point, RayError};

/// A workspace obstacle and its derived segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    id: String,
    shape: ObstacleShape,
    kind: ObstacleKind,
    description: String,
    points: Vec<Point>,
    segments: Vec<LineSegment>,
}

impl Obstacle {
    /// Build an obstacle from at least two ordered corner points.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::InvalidGeometry`] when fewer than two points are
    /// supplied.
    pub fn new(
        id: impl Into<String>,
        points: Vec<Point>,
        shape: ObstacleShape,
        kind: ObstacleKind,
        description: impl Into<String>,
    ) -> Result<Self, RayError> {
        let id = id.into();
        check_points(&id, &points)?;
        let description = description.into();
        let segments = decompose(&points, shape, &description);
        Ok(Self {
            id,
            shape,
            kind,
            description,
            points,
            segments,
        })
    }

    /// Replace the corner points and, when given, the shape tag.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::InvalidGeometry`] when fewer than two points are
    /// supplied. The obstacle is left untouched in that case.
    pub fn update(&mut self, points: Vec<Point>, shape: Option<ObstacleShape>) -> Result<(), RayError> {
        check_points(&self.id, &points)?;
        if let Some(shape) = shape {
            self.shape = shape;
        }
        self.segments = decompose(&points, self.shape, &self.description);
        self.points = points;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn shape(&self) -> ObstacleShape {
        self.shape
    }

    pub fn kind(&self) -> ObstacleKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }
}

fn check_points(id: &str, points: &[Point]) -> Result<(), RayError> {
    if points.len() < 2 {
        return Err(RayError::InvalidGeometry {
            obstacle: id.to_string(),
            details: format!("needs at least two corner points, got {}", points.len()),
        });
    }
    Ok(())
}

/// Derive segments for `shape`. `points` holds at least two entries.
fn decompose(points: &[Point], shape: ObstacleShape, description: &str) -> Vec<LineSegment> {
    match shape {
        ObstacleShape::Polygon => points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| LineSegment::new(*a, *b, description))
            .collect(),
        ObstacleShape::Line => vec![LineSegment::new(points[0], points[1], description)],
        ObstacleShape::Unknown => vec![LineSegment::new(points[0], points[0], description)],
    }
}
