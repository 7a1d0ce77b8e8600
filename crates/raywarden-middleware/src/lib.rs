//! `raywarden-middleware` – Transport plumbing
//!
//! Routes frames between the collision core and external clients without
//! caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, topic-based publish/subscribe bus built on Tokio
//!   broadcast channels.
//! - [`transport`] – the [`Transport`][transport::Transport] seam used by the
//!   tick loop, and its in-process [`BusTransport`][transport::BusTransport].
//! - [`ws_bridge`] – WebSocket server that feeds client telemetry onto the
//!   bus and pushes control frames back out.

pub mod bus;
pub mod transport;
pub mod ws_bridge;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use transport::{BusTransport, Transport};
pub use ws_bridge::{WireEnvelope, WsBridge};
