//! The transport seam between the collision core and the outside world.
//!
//! The tick loop never speaks to a broker or socket directly. It publishes
//! through a [`Transport`] and consumes the transport's inbound
//! [`Frame`] stream.
//!
//! - [`Transport`] – the trait every transport must implement.
//! - [`BusTransport`] – publishes onto the in-process
//!   [`EventBus`][crate::bus::EventBus]; the
//!   [`WsBridge`][crate::ws_bridge::WsBridge] carries bus traffic to clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use raywarden_types::config::ChannelConfig;
use raywarden_types::{Frame, RayError};
use tracing::{debug, info};

use crate::bus::{EventBus, Topic};

/// Every transport must implement this trait.
///
/// # Contract
///
/// * `connect` – prepare the transport. Calling it again is harmless.
///
/// * `publish` – send `payload` to the configured control destination. A
///   `routing_suffix` is appended to the base routing key as one more
///   `.`-delimited token.
///
/// * `frames` – a live stream of inbound frames from every subscribed
///   channel.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<(), RayError>;

    async fn publish(&self, payload: String, routing_suffix: Option<&str>) -> Result<(), RayError>;

    async fn frames(&self) -> BoxStream<'static, Frame>;
}

/// Join a base routing key and an optional suffix token.
pub fn routing_key(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) if base.is_empty() => s.to_string(),
        Some(s) => format!("{base}.{s}"),
        None => base.to_string(),
    }
}

/// [`Transport`] over the in-process [`EventBus`].
///
/// Publishes land on [`Topic::Control`]; inbound frames are read from
/// [`Topic::Telemetry`].
pub struct BusTransport {
    bus: Arc<EventBus>,
    publisher: ChannelConfig,
    connected: AtomicBool,
}

impl BusTransport {
    /// Create a transport that publishes to `publisher`.
    pub fn new(bus: Arc<EventBus>, publisher: ChannelConfig) -> Self {
        Self {
            bus,
            publisher,
            connected: AtomicBool::new(false),
        }
    }

    pub fn publisher(&self) -> &ChannelConfig {
        &self.publisher
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for BusTransport {
    async fn connect(&self) -> Result<(), RayError> {
        if !self.connected.swap(true, Ordering::AcqRel) {
            info!(
                exchange = %self.publisher.exchange,
                routing_key = %self.publisher.routing_key,
                "bus transport connected"
            );
        }
        Ok(())
    }

    async fn publish(&self, payload: String, routing_suffix: Option<&str>) -> Result<(), RayError> {
        if !self.is_connected() {
            return Err(RayError::Transport("publish before connect".to_string()));
        }
        let key = routing_key(&self.publisher.routing_key, routing_suffix);
        let frame = Frame::new(self.publisher.exchange.clone(), key, payload);
        let delivered = self.bus.publish_to(Topic::Control, frame)?;
        debug!(delivered, "control frame published");
        Ok(())
    }

    async fn frames(&self) -> BoxStream<'static, Frame> {
        self.bus.subscribe_to(Topic::Telemetry).into_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn control() -> ChannelConfig {
        ChannelConfig {
            exchange: "control_exchange".to_string(),
            routing_key: "control.robot".to_string(),
        }
    }

    #[test]
    fn routing_key_appends_suffix_token() {
        assert_eq!(routing_key("control.robot", Some("7")), "control.robot.7");
        assert_eq!(routing_key("control.robot", None), "control.robot");
        assert_eq!(routing_key("", Some("7")), "7");
    }

    #[tokio::test]
    async fn publish_lands_on_control_lane() -> Result<(), Box<dyn std::error::Error>> {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe_to(Topic::Control);
        let transport = BusTransport::new(Arc::clone(&bus), control());

        transport.connect().await?;
        transport
            .publish(r#"{"id":"7","control":"stop"}"#.to_string(), Some("7"))
            .await?;

        let frame = rx.recv().await?;
        assert_eq!(frame.exchange, "control_exchange");
        assert_eq!(frame.routing_key, "control.robot.7");
        assert_eq!(frame.body, r#"{"id":"7","control":"stop"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn publish_before_connect_fails() {
        let transport = BusTransport::new(Arc::new(EventBus::default()), control());
        let result = transport.publish("{}".to_string(), None).await;
        assert!(matches!(result, Err(RayError::Transport(_))));
    }

    #[tokio::test]
    async fn connect_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let transport = BusTransport::new(Arc::new(EventBus::default()), control());
        transport.connect().await?;
        transport.connect().await?;
        assert!(transport.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn frames_yield_telemetry_lane_traffic() -> Result<(), Box<dyn std::error::Error>> {
        let bus = Arc::new(EventBus::default());
        let transport = BusTransport::new(Arc::clone(&bus), control());
        let mut frames = transport.frames().await;

        bus.publish_to(Topic::Control, Frame::new("control_exchange", "control.robot.1", "{}"))?;
        bus.publish_to(Topic::Telemetry, Frame::new("telemetry_exchange", "telemetry.robot.7", "{}"))?;

        let frame = frames.next().await.ok_or("stream ended")?;
        assert_eq!(frame.routing_key, "telemetry.robot.7");
        Ok(())
    }
}
