//! Typed configuration schema.
//!
//! These structs are deserialised once at startup by the process driver and
//! passed by reference into each component's constructor. Call
//! [`RaywardenConfig::validate`] before building anything from them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ObstacleKind, ObstacleShape, Point, RayError};

/// Exchange on which stop directives are published.
pub const CONTROL_EXCHANGE: &str = "control_exchange";

/// Root of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaywardenConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    /// One tick loop is built per work area.
    #[serde(default)]
    pub workareas: Vec<WorkareaConfig>,
}

impl RaywardenConfig {
    /// Validate every work area.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::Config`] for the first invalid work area, or when
    /// no work area is configured at all.
    pub fn validate(&self) -> Result<(), RayError> {
        if self.workareas.is_empty() {
            return Err(RayError::Config("no workareas configured".to_string()));
        }
        for workarea in &self.workareas {
            workarea.validate()?;
        }
        Ok(())
    }
}

/// Plaintext health responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: default_health_port(),
        }
    }
}

/// WebSocket bridge that carries telemetry in and directives out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_port")]
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_bridge_port(),
        }
    }
}

/// A monitored work cell: its scene, thresholds and channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkareaConfig {
    pub id: String,
    pub attribute: AttributeConfig,
    /// Optional in the file so that its absence is reported by
    /// [`validate`][Self::validate] rather than as a parse error.
    #[serde(default)]
    pub protocol: Option<ProtocolConfig>,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl WorkareaConfig {
    /// Check the invariants the tick loop relies on.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), RayError> {
        let fail = |msg: String| Err(RayError::Config(format!("workarea '{}': {msg}", self.id)));

        let Some(protocol) = &self.protocol else {
            return fail("missing protocol section".to_string());
        };
        if protocol.control_publisher().is_none() {
            return fail(format!("no publisher on exchange '{CONTROL_EXCHANGE}'"));
        }
        if protocol.subscribers.is_empty() {
            return fail("no subscribers configured".to_string());
        }

        let attr = &self.attribute;
        if !attr.interval.is_finite() {
            return fail(format!("interval must be a finite number, got {}", attr.interval));
        }
        let distance = &attr.collision.distance;
        if !distance.robot.is_finite() || !distance.environment.is_finite() {
            return fail("collision distances must be finite numbers".to_string());
        }

        for obstacle in &self.workspace.obstacles {
            if obstacle.points.len() < 2 {
                return fail(format!(
                    "obstacle '{}' needs at least two points, got {}",
                    obstacle.id,
                    obstacle.points.len()
                ));
            }
        }
        for robot in &self.workspace.robots {
            // Robot ids are embedded in underscore-delimited segment
            // descriptions and must survive the split intact.
            if robot.id.is_empty() || robot.id.contains('_') {
                return fail(format!("robot id '{}' must be non-empty and contain no '_'", robot.id));
            }
            if !robot.footprint_half_extent.is_finite() || robot.footprint_half_extent < 0.0 {
                return fail(format!("robot '{}' has an invalid footprint", robot.id));
            }
        }
        Ok(())
    }
}

/// Tick pacing and danger thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeConfig {
    /// Seconds between ticks. Negative means uncapped.
    #[serde(default = "default_interval")]
    pub interval: f64,
    pub collision: CollisionConfig,
}

impl AttributeConfig {
    /// `None` when ticks should run back to back.
    pub fn tick_interval(&self) -> Option<Duration> {
        if self.interval < 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(self.interval).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    pub distance: DistanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceConfig {
    /// Environment rays are reported when their distance exceeds this value.
    #[serde(default)]
    pub environment: f64,
    /// Robot rays closer than this value trigger a stop directive.
    pub robot: f64,
}

/// Inbound and outbound channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub publishers: Vec<ChannelConfig>,
    #[serde(default)]
    pub subscribers: Vec<ChannelConfig>,
}

impl ProtocolConfig {
    /// The publisher bound to [`CONTROL_EXCHANGE`], if any.
    pub fn control_publisher(&self) -> Option<&ChannelConfig> {
        self.publishers.iter().find(|p| p.exchange == CONTROL_EXCHANGE)
    }

    /// True when `exchange` is one of the subscribed exchanges.
    pub fn subscribes_to(&self, exchange: &str) -> bool {
        self.subscribers.iter().any(|s| s.exchange == exchange)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub exchange: String,
    /// Dotted base routing key; publishers append a `.suffix`.
    pub routing_key: String,
}

/// Scene seed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub robots: Vec<RobotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub id: String,
    pub points: Vec<Point>,
    pub render: RenderConfig,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub shape: ObstacleShape,
    #[serde(rename = "type", default)]
    pub kind: ObstacleKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    pub id: String,
    pub base: BasePosition,
    /// Half side length of the square base footprint.
    #[serde(default = "default_footprint_half_extent")]
    pub footprint_half_extent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BasePosition {
    pub x: f64,
    pub y: f64,
}

impl From<BasePosition> for Point {
    fn from(b: BasePosition) -> Self {
        Point::new(b.x, b.y)
    }
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_health_port() -> u16 {
    8081
}
fn default_bridge_port() -> u16 {
    9090
}
fn default_interval() -> f64 {
    0.1
}
fn default_footprint_half_extent() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKAREA: &str = r#"
        id = "cell_a"

        [attribute]
        interval = 0.5

        [attribute.collision.distance]
        robot = 1.5

        [protocol]
        publishers = [{ exchange = "control_exchange", routing_key = "control.robot" }]
        subscribers = [{ exchange = "telemetry_exchange", routing_key = "telemetry.#" }]

        [[workspace.obstacles]]
        id = "wall_north"
        points = [[0.0, 10.0], [10.0, 10.0]]
        description = "wall_north"
        render = { shape = "line", type = "static" }

        [[workspace.robots]]
        id = "7"
        base = { x = 5.0, y = 5.0 }
    "#;

    fn workarea() -> WorkareaConfig {
        toml::from_str(WORKAREA).expect("fixture parses")
    }

    #[test]
    fn fixture_is_valid() {
        let w = workarea();
        w.validate().expect("valid");
        assert_eq!(w.attribute.collision.distance.environment, 0.0);
        assert_eq!(w.workspace.robots[0].footprint_half_extent, 2.0);
        assert_eq!(w.workspace.obstacles[0].render.shape, ObstacleShape::Line);
    }

    #[test]
    fn missing_protocol_is_rejected() {
        let mut w = workarea();
        w.protocol = None;
        let err = w.validate().unwrap_err();
        assert!(err.to_string().contains("missing protocol section"));
    }

    #[test]
    fn missing_control_publisher_is_rejected() {
        let mut w = workarea();
        if let Some(p) = w.protocol.as_mut() {
            p.publishers[0].exchange = "other_exchange".to_string();
        }
        assert!(w.validate().is_err());
    }

    #[test]
    fn non_numeric_distance_fails_to_parse() {
        let raw = WORKAREA.replace("robot = 1.5", "robot = \"close\"");
        assert!(toml::from_str::<WorkareaConfig>(&raw).is_err());
    }

    #[test]
    fn single_point_obstacle_is_rejected() {
        let mut w = workarea();
        w.workspace.obstacles[0].points.truncate(1);
        assert!(w.validate().is_err());
    }

    #[test]
    fn underscore_in_robot_id_is_rejected() {
        let mut w = workarea();
        w.workspace.robots[0].id = "arm_1".to_string();
        assert!(w.validate().is_err());
    }

    #[test]
    fn negative_interval_means_uncapped() {
        let mut w = workarea();
        assert_eq!(w.attribute.tick_interval(), Some(Duration::from_millis(500)));
        w.attribute.interval = -1.0;
        assert_eq!(w.attribute.tick_interval(), None);
    }

    #[test]
    fn empty_root_config_is_rejected() {
        let cfg: RaywardenConfig = toml::from_str("").expect("parses");
        assert_eq!(cfg.health.port, 8081);
        assert!(cfg.validate().is_err());
    }
}
