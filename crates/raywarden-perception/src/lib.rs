//! `raywarden-perception` – 2-D raycasting geometry.
//!
//! Models the worker and the workspace as points and line segments and
//! measures, on 360 rays around the worker, how far away the nearest
//! obstacle is.
//!
//! # Modules
//!
//! - [`ray`] – [`Ray`][ray::Ray]: strict ray/segment intersection.
//! - [`obstacle`] – [`Obstacle`][obstacle::Obstacle]: corner points decomposed
//!   into segments by shape.
//! - [`scene`] – [`Scene`][scene::Scene]: the mutable obstacle registry,
//!   seeded from configuration.
//! - [`particle`] – [`Particle`][particle::Particle]: 360-ray ranging against
//!   the scene's segments.

pub mod obstacle;
pub mod particle;
pub mod ray;
pub mod scene;

pub use obstacle::Obstacle;
pub use particle::Particle;
pub use ray::Ray;
pub use scene::{Limb, Scene};
