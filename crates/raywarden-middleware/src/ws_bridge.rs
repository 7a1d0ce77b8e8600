//! WebSocket bridge between external clients and the internal [`EventBus`].
//!
//! This module provides [`WsBridge`], which:
//!
//! 1. **Ingests** JSON envelopes sent by telemetry producers and publishes
//!    them as [`Frame`]s on [`Topic::Telemetry`].
//!
//! 2. **Forwards** every [`Topic::Control`] frame (stop directives) to every
//!    connected client as the same JSON envelope.
//!
//! Envelope shape, in both directions:
//!
//! ```json
//! {"exchange": "telemetry_exchange", "routing_key": "telemetry.robot.7", "body": {"id": "7"}}
//! ```
//!
//! `body` may be a JSON object or a string holding JSON text. The bridge does
//! not look inside it.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use raywarden_types::{Frame, RayError};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, Topic};

/// The JSON shape carried over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub exchange: String,
    pub routing_key: String,
    pub body: serde_json::Value,
}

impl WireEnvelope {
    /// Wrap an outbound frame. A body that is not valid JSON is sent as a
    /// JSON string.
    pub fn from_frame(frame: &Frame) -> Self {
        let body = serde_json::from_str(&frame.body)
            .unwrap_or_else(|_| serde_json::Value::String(frame.body.clone()));
        Self {
            exchange: frame.exchange.clone(),
            routing_key: frame.routing_key.clone(),
            body,
        }
    }

    /// Unwrap into an inbound frame with the body as JSON text.
    pub fn into_frame(self) -> Frame {
        let body = match self.body {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        };
        Frame::new(self.exchange, self.routing_key, body)
    }
}

/// Bridge between WebSocket clients and the bus.
#[derive(Clone)]
pub struct WsBridge {
    bus: Arc<EventBus>,
}

impl WsBridge {
    /// Create a new bridge backed by `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Bind `addr` and serve until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::Io`] if the TCP listener cannot be bound.
    pub async fn run_ws_server(self, addr: SocketAddr) -> Result<(), RayError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RayError::Io(format!("ws bind error on {addr}: {e}")))?;
        info!(%addr, "websocket bridge listening");
        self.serve(listener).await
    }

    /// Accept clients on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), RayError> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let bridge = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = bridge.handle_ws_client(stream, peer).await {
                            error!(peer = %peer, error = %e, "ws client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "ws accept error");
                }
            }
        }
    }

    async fn handle_ws_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), RayError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| RayError::Transport(format!("ws handshake from {peer}: {e}")))?;
        debug!(peer = %peer, "ws client connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut rx = self.bus.subscribe_to(Topic::Control);

        loop {
            tokio::select! {
                // Forward control frames to the client.
                result = rx.recv() => {
                    match result {
                        Ok(frame) => {
                            let json = serde_json::to_string(&WireEnvelope::from_frame(&frame))
                                .map_err(|e| RayError::Serialization(e.to_string()))?;
                            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(peer = %peer, lagged_by = n, "ws client lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        Some(Ok(Message::Text(text))) => {
                            self.handle_incoming_ws_message(text.as_str());
                        }
                        _ => {}
                    }
                }
            }
        }

        debug!(peer = %peer, "ws client disconnected");
        Ok(())
    }

    /// Parse an inbound envelope and publish it on the telemetry lane.
    ///
    /// Text that is not an envelope is dropped.
    fn handle_incoming_ws_message(&self, text: &str) {
        let envelope = match serde_json::from_str::<WireEnvelope>(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "dropping malformed ws envelope");
                return;
            }
        };
        if let Err(e) = self.bus.publish_to(Topic::Telemetry, envelope.into_frame()) {
            warn!(error = %e, "failed to publish inbound frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    fn make_bridge() -> (Arc<EventBus>, WsBridge) {
        let bus = Arc::new(EventBus::default());
        let bridge = WsBridge::new(Arc::clone(&bus));
        (bus, bridge)
    }

    #[tokio::test]
    async fn incoming_envelope_is_published_as_telemetry() -> Result<(), Box<dyn std::error::Error>> {
        let (bus, bridge) = make_bridge();
        let mut rx = bus.subscribe_to(Topic::Telemetry);

        bridge.handle_incoming_ws_message(
            r#"{"exchange":"telemetry_exchange","routing_key":"telemetry.robot.7","body":{"id":"7"}}"#,
        );

        let frame = rx.recv().await?;
        assert_eq!(frame.exchange, "telemetry_exchange");
        assert_eq!(frame.routing_key, "telemetry.robot.7");
        assert_eq!(frame.body, r#"{"id":"7"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn string_body_is_passed_through_untouched() -> Result<(), Box<dyn std::error::Error>> {
        let (bus, bridge) = make_bridge();
        let mut rx = bus.subscribe_to(Topic::Telemetry);

        bridge.handle_incoming_ws_message(
            r#"{"exchange":"e","routing_key":"telemetry.pls.w1","body":"{\"id\": \"w1\"}"}"#,
        );

        assert_eq!(rx.recv().await?.body, r#"{"id": "w1"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_message_is_ignored() {
        let (bus, bridge) = make_bridge();
        let mut rx = bus.subscribe_to(Topic::Telemetry);

        bridge.handle_incoming_ws_message("not json");
        bridge.handle_incoming_ws_message(r#"{"op":"subscribe","topic":"/unknown"}"#);

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err(), "malformed text must not reach the bus");
    }

    #[test]
    fn outbound_envelope_embeds_json_body() {
        let frame = Frame::new("control_exchange", "control.robot.7", r#"{"id":"7","control":"stop"}"#);
        let envelope = WireEnvelope::from_frame(&frame);
        assert_eq!(envelope.body["control"], "stop");

        let raw = Frame::new("control_exchange", "control.robot.7", "stop");
        assert_eq!(WireEnvelope::from_frame(&raw).body, serde_json::Value::String("stop".into()));
    }

    #[tokio::test]
    async fn client_round_trip_over_loopback() -> Result<(), Box<dyn std::error::Error>> {
        let (bus, bridge) = make_bridge();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(bridge.serve(listener));

        let mut telemetry = bus.subscribe_to(Topic::Telemetry);
        let (mut client, _) = connect_async(format!("ws://{addr}")).await?;

        client
            .send(Message::Text(
                r#"{"exchange":"telemetry_exchange","routing_key":"telemetry.robot.7","body":{"id":"7"}}"#.into(),
            ))
            .await?;
        let inbound = tokio::time::timeout(std::time::Duration::from_secs(2), telemetry.recv()).await??;
        assert_eq!(inbound.routing_key, "telemetry.robot.7");

        // The server subscribed to the control lane before reading the first frame.
        bus.publish_to(
            Topic::Control,
            Frame::new("control_exchange", "control.robot.7", r#"{"id":"7","control":"stop"}"#),
        )?;
        let reply = tokio::time::timeout(std::time::Duration::from_secs(2), client.next())
            .await?
            .ok_or("socket closed")??;
        let envelope: WireEnvelope = serde_json::from_str(reply.to_text()?)?;
        assert_eq!(envelope.routing_key, "control.robot.7");
        assert_eq!(envelope.body["id"], "7");
        Ok(())
    }
}
