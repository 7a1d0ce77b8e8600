//! `raywarden-runtime` – Tick orchestration
//!
//! Drives each work area's collision engine: validated telemetry flows from
//! the transport into per-source queues, and a fixed-order tick turns it into
//! stop directives.
//!
//! # Modules
//!
//! - [`inbound`] – [`InboundFilter`][inbound::InboundFilter]: exchange,
//!   routing-key and body validation, then dispatch by
//!   [`TelemetryKind`][inbound::TelemetryKind]; [`ingest`][inbound::ingest]
//!   drains a transport's frame stream into the queues.
//! - [`queues`] – [`IngestHandle`][queues::IngestHandle] and
//!   [`TelemetryQueues`][queues::TelemetryQueues]: the unbounded robot and
//!   personnel lanes.
//! - [`tick_loop`] – [`TickLoop`][tick_loop::TickLoop]: robot apply,
//!   personnel apply and range, publish, pace.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.

pub mod inbound;
pub mod queues;
pub mod telemetry;
pub mod tick_loop;

pub use inbound::{InboundFilter, InboundMessage, TelemetryKind, ingest};
pub use queues::{IngestHandle, TelemetryQueues, telemetry_queues};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use tick_loop::{TickLoop, TickOutcome};
