//! [`Scene`] – the mutable registry of obstacles queried by ranging.
//!
//! A scene is seeded once from a [`WorkspaceConfig`] and afterwards only
//! mutated in place: obstacles are never added or removed while the tick
//! loop runs.
//!
//! # Robot seeding
//!
//! Every configured robot contributes four obstacles:
//!
//! | Id / description | Shape | Kind |
//! |---|---|---|
//! | `robot_<id>_base` | square polygon around the base | static |
//! | `robot_<id>_base_shoulder` | line | dynamic |
//! | `robot_<id>_shoulder_elbow` | line | dynamic |
//! | `robot_<id>_elbow_wrist` | line | dynamic |
//!
//! Limb lines start out as zero-length placeholders at the base position and
//! take real geometry from the first robot telemetry message.

use std::collections::HashMap;

use raywarden_types::config::{RobotConfig, WorkspaceConfig};
use raywarden_types::{LineSegment, ObstacleKind, ObstacleShape, Point, RayError, RobotTelemetry};
use tracing::{debug, trace};

use crate::obstacle::Obstacle;

/// The three tracked arm links of a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limb {
    BaseShoulder,
    ShoulderElbow,
    ElbowWrist,
}

impl Limb {
    pub const ALL: [Limb; 3] = [Limb::BaseShoulder, Limb::ShoulderElbow, Limb::ElbowWrist];

    pub fn as_str(self) -> &'static str {
        match self {
            Limb::BaseShoulder => "base_shoulder",
            Limb::ShoulderElbow => "shoulder_elbow",
            Limb::ElbowWrist => "elbow_wrist",
        }
    }

    /// The two joints this link spans, taken from a telemetry report.
    pub fn endpoints(self, telemetry: &RobotTelemetry) -> [Point; 2] {
        match self {
            Limb::BaseShoulder => [telemetry.base, telemetry.shoulder],
            Limb::ShoulderElbow => [telemetry.shoulder, telemetry.elbow],
            Limb::ElbowWrist => [telemetry.elbow, telemetry.wrist],
        }
    }
}

/// Obstacle id (and description) of a robot limb: `robot_<id>_<limb>`.
pub fn limb_id(robot_id: &str, limb: Limb) -> String {
    format!("robot_{robot_id}_{}", limb.as_str())
}

/// Obstacle id (and description) of a robot's base footprint.
pub fn footprint_id(robot_id: &str) -> String {
    format!("robot_{robot_id}_base")
}

/// Obstacle registry keyed by id.
///
/// Obstacles are kept in seed order so that [`get_segments`][Self::get_segments]
/// is deterministic; ranging tie-breaks depend on segment order.
#[derive(Debug, Default)]
pub struct Scene {
    obstacles: Vec<Obstacle>,
    index: HashMap<String, usize>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a scene from static obstacles and known robots.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::InvalidGeometry`] if any static obstacle has fewer
    /// than two points.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, RayError> {
        let mut scene = Self::new();
        for obstacle in &config.obstacles {
            scene.insert(Obstacle::new(
                obstacle.id.clone(),
                obstacle.points.clone(),
                obstacle.render.shape,
                obstacle.render.kind,
                obstacle.description.clone(),
            )?);
        }
        for robot in &config.robots {
            scene.seed_robot(robot)?;
        }
        debug!(
            obstacles = scene.len(),
            segments = scene.segment_count(),
            "scene seeded"
        );
        Ok(scene)
    }

    /// Add an obstacle, replacing any existing obstacle with the same id.
    pub fn insert(&mut self, obstacle: Obstacle) {
        match self.index.get(obstacle.id()) {
            Some(&i) => self.obstacles[i] = obstacle,
            None => {
                self.index.insert(obstacle.id().to_string(), self.obstacles.len());
                self.obstacles.push(obstacle);
            }
        }
    }

    /// Replace the geometry of obstacle `id` in place.
    ///
    /// An unknown `id` is a silent no-op: nothing is created and no error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::InvalidGeometry`] when the obstacle exists and
    /// `points` holds fewer than two entries.
    pub fn update(
        &mut self,
        id: &str,
        points: Vec<Point>,
        shape: Option<ObstacleShape>,
    ) -> Result<(), RayError> {
        match self.index.get(id) {
            Some(&i) => self.obstacles[i].update(points, shape),
            None => {
                trace!(obstacle = id, "update for unknown obstacle ignored");
                Ok(())
            }
        }
    }

    /// Move the three limb lines of a robot to the reported joint positions.
    ///
    /// Robots that were not seeded are ignored, per [`update`][Self::update].
    pub fn update_robot(&mut self, telemetry: &RobotTelemetry) -> Result<(), RayError> {
        for limb in Limb::ALL {
            self.update(
                &limb_id(&telemetry.id, limb),
                limb.endpoints(telemetry).to_vec(),
                Some(ObstacleShape::Line),
            )?;
        }
        Ok(())
    }

    /// Look up an obstacle by id.
    pub fn get(&self, id: &str) -> Option<&Obstacle> {
        self.index.get(id).map(|&i| &self.obstacles[i])
    }

    /// Flatten every obstacle's current segments, in seed order.
    pub fn get_segments(&self) -> Vec<LineSegment> {
        self.obstacles
            .iter()
            .flat_map(|o| o.segments().iter().cloned())
            .collect()
    }

    /// Number of obstacles.
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    fn segment_count(&self) -> usize {
        self.obstacles.iter().map(|o| o.segments().len()).sum()
    }

    fn seed_robot(&mut self, robot: &RobotConfig) -> Result<(), RayError> {
        let base: Point = robot.base.into();
        let h = robot.footprint_half_extent;
        let footprint = vec![
            Point::new(base.x - h, base.y - h),
            Point::new(base.x + h, base.y - h),
            Point::new(base.x + h, base.y + h),
            Point::new(base.x - h, base.y + h),
        ];
        let id = footprint_id(&robot.id);
        self.insert(Obstacle::new(
            id.clone(),
            footprint,
            ObstacleShape::Polygon,
            ObstacleKind::Static,
            id,
        )?);

        for limb in Limb::ALL {
            let id = limb_id(&robot.id, limb);
            self.insert(Obstacle::new(
                id.clone(),
                vec![base, base],
                ObstacleShape::Line,
                ObstacleKind::Dynamic,
                id,
            )?);
        }
        Ok(())
    }
}
