//! [`CollisionDetector`] – threshold classification over a ranging pass.
//!
//! Each call to [`CollisionDetector::ranging`] casts the particle's rays
//! against the scene's current segments and derives two lists from the
//! fresh snapshot. Both lists are recomputed every pass and never
//! accumulate.
//!
//! | List | Entry qualifies when |
//! |---|---|
//! | environment | `distance > env_collision_distance` |
//! | robot | `distance < robot_collision_distance` and the description is `robot_<id>_...` |
//!
//! With the usual environment threshold of `0` the environment rule reports
//! every ray that hit something.
//!
//! Robot candidates become [`StopDirective`]s. Several limbs of one robot may
//! qualify in the same pass; [`dedup_directives`] collapses them to one
//! directive per robot before publication.

use std::collections::HashMap;

use raywarden_perception::{Particle, Scene};
use raywarden_types::config::WorkareaConfig;
use raywarden_types::{ObstacleShape, Point, RangingEntry, RayError, RobotTelemetry, StopDirective};
use tracing::{debug, trace};

/// Distance thresholds fixed for the lifetime of a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionThresholds {
    pub env_collision_distance: f64,
    pub robot_collision_distance: f64,
}

/// Output of one ranging pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionReport {
    pub environment: Vec<RangingEntry>,
    pub robot: Vec<StopDirective>,
}

/// Owns the scene and the particle and classifies every ranging snapshot.
#[derive(Debug)]
pub struct CollisionDetector {
    scene: Scene,
    particle: Particle,
    thresholds: CollisionThresholds,
    views: Vec<RangingEntry>,
    env_collisions: Vec<RangingEntry>,
    robot_collisions: Vec<StopDirective>,
}

impl CollisionDetector {
    pub fn new(scene: Scene, particle: Particle, thresholds: CollisionThresholds) -> Self {
        Self {
            scene,
            particle,
            thresholds,
            views: Vec::new(),
            env_collisions: Vec::new(),
            robot_collisions: Vec::new(),
        }
    }

    /// Seed a detector for `personnel_id` from a work-area configuration.
    ///
    /// The particle starts with an unknown position.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::InvalidGeometry`] if the scene cannot be seeded.
    pub fn from_config(config: &WorkareaConfig, personnel_id: &str) -> Result<Self, RayError> {
        let distance = &config.attribute.collision.distance;
        Ok(Self::new(
            Scene::from_config(&config.workspace)?,
            Particle::new(personnel_id),
            CollisionThresholds {
                env_collision_distance: distance.environment,
                robot_collision_distance: distance.robot,
            },
        ))
    }

    /// Move the tracked particle.
    pub fn update_particle(&mut self, x: f64, y: f64) {
        self.particle.set_position(x, y);
    }

    /// Replace the geometry of one obstacle. Unknown ids are ignored.
    pub fn update_scene(
        &mut self,
        obstacle_id: &str,
        points: Vec<Point>,
        shape: Option<ObstacleShape>,
    ) -> Result<(), RayError> {
        self.scene.update(obstacle_id, points, shape)
    }

    /// Move a robot's three limb lines to the reported joints.
    pub fn update_robot(&mut self, telemetry: &RobotTelemetry) -> Result<(), RayError> {
        self.scene.update_robot(telemetry)
    }

    /// Run one ranging pass and reclassify.
    pub fn ranging(&mut self) -> CollisionReport {
        self.views = self.particle.look(&self.scene.get_segments());
        self.env_collisions = environment_collisions(&self.views, self.thresholds.env_collision_distance);
        self.robot_collisions = robot_collisions(&self.views, self.thresholds.robot_collision_distance);

        trace!(
            rays = self.views.len(),
            environment = self.env_collisions.len(),
            robot = self.robot_collisions.len(),
            "ranging pass complete"
        );
        CollisionReport {
            environment: self.env_collisions.clone(),
            robot: self.robot_collisions.clone(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn particle(&self) -> &Particle {
        &self.particle
    }

    pub fn thresholds(&self) -> CollisionThresholds {
        self.thresholds
    }

    /// The last ranging snapshot.
    pub fn views(&self) -> &[RangingEntry] {
        &self.views
    }

    /// Environment entries from the last pass.
    pub fn env_collisions(&self) -> &[RangingEntry] {
        &self.env_collisions
    }

    /// Robot directives from the last pass, before deduplication.
    pub fn robot_collisions(&self) -> &[StopDirective] {
        &self.robot_collisions
    }
}

/// Entries whose distance is known and greater than `threshold`.
pub fn environment_collisions(views: &[RangingEntry], threshold: f64) -> Vec<RangingEntry> {
    views
        .iter()
        .filter(|v| v.distance.is_some_and(|d| d > threshold))
        .cloned()
        .collect()
}

/// One stop directive per entry closer than `threshold` that hit a robot segment.
pub fn robot_collisions(views: &[RangingEntry], threshold: f64) -> Vec<StopDirective> {
    views
        .iter()
        .filter(|v| v.distance.is_some_and(|d| d < threshold))
        .filter_map(|v| {
            let robot_id = robot_id_of(v.obstacle.as_deref()?)?;
            debug!(robot_id, angle = v.angle, distance = ?v.distance, "robot within collision distance");
            Some(StopDirective::stop(robot_id))
        })
        .collect()
}

/// Robot id encoded in a `robot_<id>_<segment>` description.
pub fn robot_id_of(description: &str) -> Option<&str> {
    let mut tokens = description.split('_');
    match (tokens.next(), tokens.next()) {
        (Some("robot"), Some(id)) if !id.is_empty() => Some(id),
        _ => None,
    }
}

/// Collapse directives to one per robot id.
///
/// The last directive seen for an id wins; output order follows the first
/// appearance of each id.
pub fn dedup_directives(directives: Vec<StopDirective>) -> Vec<StopDirective> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<StopDirective> = Vec::new();
    for directive in directives {
        match slots.get(&directive.id) {
            Some(&i) => unique[i] = directive,
            None => {
                slots.insert(directive.id.clone(), unique.len());
                unique.push(directive);
            }
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use raywarden_perception::Obstacle;
    use raywarden_types::{LineSegment, ObstacleKind};

    fn entry(angle: u16, obstacle: &str, distance: f64) -> RangingEntry {
        RangingEntry {
            angle,
            obstacle: Some(obstacle.to_string()),
            distance: Some(distance),
            contact_point: Some(Point::new(distance, 0.0)),
        }
    }

    fn line(id: &str, a: (f64, f64), b: (f64, f64)) -> Obstacle {
        Obstacle::new(
            id,
            vec![Point::new(a.0, a.1), Point::new(b.0, b.1)],
            ObstacleShape::Line,
            ObstacleKind::Static,
            id,
        )
        .expect("valid line")
    }

    fn detector(obstacles: Vec<Obstacle>, env: f64, robot: f64) -> CollisionDetector {
        let mut scene = Scene::new();
        for o in obstacles {
            scene.insert(o);
        }
        CollisionDetector::new(
            scene,
            Particle::at("worker", Point::new(0.0, 0.0)),
            CollisionThresholds {
                env_collision_distance: env,
                robot_collision_distance: robot,
            },
        )
    }

    #[test]
    fn wall_ahead_is_environment_but_not_robot_collision() {
        let mut d = detector(vec![line("wall", (5.0, -5.0), (5.0, 5.0))], 0.0, 10.0);
        let report = d.ranging();

        let ahead = report
            .environment
            .iter()
            .find(|e| e.angle == 0)
            .expect("0° ray in environment list");
        assert!((ahead.distance.expect("distance") - 5.0).abs() < 1e-12);
        assert!(report.robot.is_empty());
        assert_eq!(d.views().len(), 360);
    }

    #[test]
    fn environment_rule_is_strictly_greater_than() {
        let views = vec![entry(0, "wall", 2.0), entry(1, "wall", 3.0), RangingEntry::miss(2)];
        let env = environment_collisions(&views, 2.0);
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].angle, 1);
    }

    #[test]
    fn robot_rule_is_strictly_less_than() {
        let views = vec![entry(0, "robot_7_elbow_wrist", 1.0), entry(1, "robot_8_base", 1.5)];
        let robot = robot_collisions(&views, 1.5);
        assert_eq!(robot, vec![StopDirective::stop("7")]);
    }

    #[test]
    fn non_robot_descriptions_never_produce_directives() {
        let views = vec![entry(0, "wall_east", 0.1), entry(1, "robotarm", 0.1), entry(2, "robot_", 0.1)];
        assert!(robot_collisions(&views, 10.0).is_empty());
    }

    #[test]
    fn robot_id_is_second_token() {
        assert_eq!(robot_id_of("robot_7_shoulder_elbow"), Some("7"));
        assert_eq!(robot_id_of("robot_7"), Some("7"));
        assert_eq!(robot_id_of("table"), None);
        assert_eq!(robot_id_of("wall_robot_7"), None);
    }

    #[test]
    fn dedup_keeps_one_directive_per_robot() {
        let deduped = dedup_directives(vec![
            StopDirective::stop("7"),
            StopDirective::stop("8"),
            StopDirective::stop("7"),
        ]);
        assert_eq!(deduped, vec![StopDirective::stop("7"), StopDirective::stop("8")]);
    }

    #[test]
    fn two_limbs_of_one_robot_yield_one_directive() {
        let mut d = detector(
            vec![
                line("robot_3_shoulder_elbow", (1.0, -1.0), (1.0, 1.0)),
                line("robot_3_elbow_wrist", (-1.0, -1.0), (-1.0, 1.0)),
            ],
            0.0,
            2.0,
        );
        let report = d.ranging();
        assert!(report.robot.len() > 1);
        assert_eq!(dedup_directives(report.robot), vec![StopDirective::stop("3")]);
    }

    #[test]
    fn distant_robot_is_not_stopped() {
        let mut d = detector(vec![line("robot_3_elbow_wrist", (9.0, -1.0), (9.0, 1.0))], 0.0, 2.0);
        assert!(d.ranging().robot.is_empty());
    }

    #[test]
    fn inert_until_particle_has_position() {
        let mut scene = Scene::new();
        scene.insert(line("robot_3_elbow_wrist", (1.0, -1.0), (1.0, 1.0)));
        let mut d = CollisionDetector::new(
            scene,
            Particle::new("worker"),
            CollisionThresholds {
                env_collision_distance: 0.0,
                robot_collision_distance: 5.0,
            },
        );
        let report = d.ranging();
        assert!(d.views().is_empty());
        assert_eq!(report, CollisionReport::default());

        d.update_particle(0.0, 0.0);
        assert_eq!(dedup_directives(d.ranging().robot), vec![StopDirective::stop("3")]);
    }

    #[test]
    fn classification_is_recomputed_each_pass() {
        let mut d = detector(vec![line("robot_3_elbow_wrist", (1.0, -1.0), (1.0, 1.0))], 0.0, 2.0);
        assert!(!d.ranging().robot.is_empty());

        d.update_scene(
            "robot_3_elbow_wrist",
            vec![Point::new(50.0, -1.0), Point::new(50.0, 1.0)],
            None,
        )
        .expect("update");
        assert!(d.ranging().robot.is_empty());
        assert!(d.robot_collisions().is_empty());
    }

    #[test]
    fn ranging_sees_fresh_segments_after_update() {
        let mut d = detector(vec![line("wall", (5.0, -5.0), (5.0, 5.0))], 0.0, 1.0);
        d.ranging();
        d.update_scene("wall", vec![Point::new(2.0, -5.0), Point::new(2.0, 5.0)], None)
            .expect("update");
        d.ranging();
        let ahead = &d.views()[0];
        assert!((ahead.distance.expect("distance") - 2.0).abs() < 1e-12);
        let expected = LineSegment::new(Point::new(2.0, -5.0), Point::new(2.0, 5.0), "wall");
        assert_eq!(d.scene().get_segments(), vec![expected]);
    }
}
