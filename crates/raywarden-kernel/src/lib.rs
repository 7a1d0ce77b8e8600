//! `raywarden-kernel` – Collision classification
//!
//! Turns each ranging snapshot into the two collision views the tick loop
//! acts on. It does not talk to the outside world; it only decides.
//!
//! # Modules
//!
//! - [`detection`] – [`CollisionDetector`][detection::CollisionDetector]:
//!   owns the [`Scene`][raywarden_perception::Scene] and the tracked
//!   [`Particle`][raywarden_perception::Particle], runs a ranging pass and
//!   splits the result into environment entries and per-robot
//!   [`StopDirective`][raywarden_types::StopDirective]s.

pub mod detection;

pub use detection::{
    CollisionDetector, CollisionReport, CollisionThresholds, dedup_directives,
    environment_collisions, robot_collisions, robot_id_of,
};
