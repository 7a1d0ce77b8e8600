//! `raywarden-types` – shared vocabulary for every Raywarden crate.
//!
//! Geometry primitives, ranging results, telemetry records, outbound
//! directives, transport frames and the workspace-wide [`RayError`].
//! Configuration structs live in [`config`].

pub mod config;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A 2-D coordinate. Serialised as a `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// An ordered pair of points plus the description used as a classification
/// key by the collision detector (e.g. `"robot_7_elbow_wrist"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub a: Point,
    pub b: Point,
    pub description: String,
}

impl LineSegment {
    pub fn new(a: Point, b: Point, description: impl Into<String>) -> Self {
        Self {
            a,
            b,
            description: description.into(),
        }
    }
}

/// How an obstacle's corner points are decomposed into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleShape {
    /// One segment between the first two points.
    Line,
    /// One segment per consecutive pair plus a closing segment.
    Polygon,
    /// Any tag the decomposer does not know; yields a zero-length segment.
    #[serde(other)]
    Unknown,
}

/// Whether an obstacle moves during operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    #[default]
    Static,
    Dynamic,
}

/// Result of casting one ray against the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingEntry {
    /// Ray angle in whole degrees, `0..360`.
    pub angle: u16,
    /// Description of the nearest segment hit, if any.
    pub obstacle: Option<String>,
    /// Distance from the particle to the contact point.
    pub distance: Option<f64>,
    pub contact_point: Option<Point>,
}

impl RangingEntry {
    /// An entry for a ray that hit nothing.
    pub fn miss(angle: u16) -> Self {
        Self {
            angle,
            obstacle: None,
            distance: None,
            contact_point: None,
        }
    }
}

/// Control verb carried by an outbound directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Stop,
}

/// Outbound robot directive, serialised as `{"id": "<robot_id>", "control": "stop"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StopDirective {
    pub id: String,
    pub control: Control,
}

impl StopDirective {
    pub fn stop(robot_id: impl Into<String>) -> Self {
        Self {
            id: robot_id.into(),
            control: Control::Stop,
        }
    }
}

/// Robot arm pose report. All joint fields are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotTelemetry {
    pub id: String,
    pub base: Point,
    pub shoulder: Point,
    pub elbow: Point,
    pub wrist: Point,
}

/// Personnel position estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonnelTelemetry {
    pub id: String,
    pub x_est_pos: f64,
    pub y_est_pos: f64,
    pub z_est_pos: f64,
    /// Producer timestamp; only its presence is required.
    pub timestamp: serde_json::Value,
    #[serde(default)]
    pub x_ref_pos: Option<f64>,
    #[serde(default)]
    pub y_ref_pos: Option<f64>,
}

/// A raw message as delivered by (or handed to) a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    /// Exchange / channel name, e.g. `"telemetry_exchange"`.
    pub exchange: String,
    /// Dotted routing key, e.g. `"telemetry.robot.7"`.
    pub routing_key: String,
    pub body: String,
}

impl Frame {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body: body.into(),
        }
    }
}

/// Global error type spanning geometry, configuration and transport failures.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum RayError {
    #[error("Invalid Geometry for {obstacle}: {details}")]
    InvalidGeometry { obstacle: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("I/O Error: {0}")]
    Io(String),
}
