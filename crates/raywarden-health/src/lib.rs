//! `raywarden-health` – Liveness endpoint
//!
//! A tiny TCP responder (default port `8081`) that answers every connection
//! with a fixed plaintext `200 OK` so an orchestrator can probe the process.
//! It never touches the collision engine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use raywarden_health::HealthServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     HealthServer::new()
//!         .run()
//!         .await
//!         .expect("health server failed");
//! }
//! ```

pub mod server;

pub use server::{DEFAULT_PORT, HEALTH_BODY, HealthServer, health_response, serve};
