//! Inbound frame validation and dispatch by telemetry kind.
//!
//! A frame from the transport is turned into an [`InboundMessage`] only when
//! every check passes, in order:
//!
//! 1. its exchange is one the work area subscribes to;
//! 2. its routing key names a known [`TelemetryKind`];
//! 3. its body parses into the kind's record with every required field;
//! 4. the last `.`-delimited routing key token equals the body `id`;
//! 5. for personnel, the id is the tracked worker.
//!
//! Anything else is dropped with a debug record. Rejection is never an error.

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use raywarden_types::config::ProtocolConfig;
use raywarden_types::{Frame, PersonnelTelemetry, RobotTelemetry};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::queues::IngestHandle;

/// Routing key fragment marking robot telemetry.
pub const ROBOT_KEY: &str = "telemetry.robot";
/// Routing key fragment marking personnel telemetry.
pub const PERSONNEL_KEY: &str = "telemetry.pls";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    Robot,
    Personnel,
}

impl TelemetryKind {
    /// Kind named by `routing_key`, if any.
    pub fn from_routing_key(routing_key: &str) -> Option<Self> {
        if routing_key.contains(ROBOT_KEY) {
            Some(TelemetryKind::Robot)
        } else if routing_key.contains(PERSONNEL_KEY) {
            Some(TelemetryKind::Personnel)
        } else {
            None
        }
    }
}

/// A validated telemetry record ready for queueing.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Robot(RobotTelemetry),
    Personnel(PersonnelTelemetry),
}

impl InboundMessage {
    pub fn id(&self) -> &str {
        match self {
            InboundMessage::Robot(t) => &t.id,
            InboundMessage::Personnel(t) => &t.id,
        }
    }

    pub fn kind(&self) -> TelemetryKind {
        match self {
            InboundMessage::Robot(_) => TelemetryKind::Robot,
            InboundMessage::Personnel(_) => TelemetryKind::Personnel,
        }
    }
}

/// Per-work-area frame filter.
#[derive(Debug, Clone)]
pub struct InboundFilter {
    exchanges: Vec<String>,
    personnel_id: String,
}

impl InboundFilter {
    pub fn new(exchanges: Vec<String>, personnel_id: impl Into<String>) -> Self {
        Self {
            exchanges,
            personnel_id: personnel_id.into(),
        }
    }

    /// Filter accepting the subscriber exchanges of `protocol`.
    pub fn from_protocol(protocol: &ProtocolConfig, personnel_id: impl Into<String>) -> Self {
        Self::new(
            protocol.subscribers.iter().map(|s| s.exchange.clone()).collect(),
            personnel_id,
        )
    }

    pub fn personnel_id(&self) -> &str {
        &self.personnel_id
    }

    /// Validate `frame`; `None` means it was dropped.
    pub fn accept(&self, frame: &Frame) -> Option<InboundMessage> {
        if !self.exchanges.iter().any(|e| *e == frame.exchange) {
            debug!(exchange = %frame.exchange, "dropping frame from unsubscribed exchange");
            return None;
        }
        let Some(kind) = TelemetryKind::from_routing_key(&frame.routing_key) else {
            debug!(routing_key = %frame.routing_key, "dropping frame with unknown routing key");
            return None;
        };

        let message = match kind {
            TelemetryKind::Robot => InboundMessage::Robot(parse_body(frame)?),
            TelemetryKind::Personnel => InboundMessage::Personnel(parse_body(frame)?),
        };

        let key_id = frame.routing_key.rsplit('.').next().unwrap_or_default();
        if key_id != message.id() {
            debug!(
                routing_key = %frame.routing_key,
                id = message.id(),
                "dropping frame whose routing key does not match its id"
            );
            return None;
        }
        if kind == TelemetryKind::Personnel && message.id() != self.personnel_id {
            debug!(id = message.id(), tracked = %self.personnel_id, "dropping untracked personnel");
            return None;
        }
        Some(message)
    }
}

/// Drain `frames` into the ingestion queues until the stream ends or the
/// tick loop is gone. Returns the number of messages enqueued.
#[instrument(skip_all, fields(personnel = %filter.personnel_id()))]
pub async fn ingest(mut frames: BoxStream<'static, Frame>, filter: InboundFilter, handle: IngestHandle) -> usize {
    let mut accepted = 0;
    while let Some(frame) = frames.next().await {
        let Some(message) = filter.accept(&frame) else {
            continue;
        };
        if handle.push(message).is_err() {
            info!("tick loop gone; stopping ingestion");
            break;
        }
        accepted += 1;
    }
    accepted
}

fn parse_body<T: DeserializeOwned>(frame: &Frame) -> Option<T> {
    serde_json::from_str(&frame.body)
        .map_err(|e| {
            debug!(routing_key = %frame.routing_key, error = %e, "dropping malformed telemetry");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOT_BODY: &str =
        r#"{"id":"7","base":[0,0],"shoulder":[0,1],"elbow":[1,2],"wrist":[2,2]}"#;
    const PERSON_BODY: &str =
        r#"{"id":"w1","x_est_pos":1.0,"y_est_pos":2.0,"z_est_pos":0.0,"timestamp":1700000000.5}"#;

    fn filter() -> InboundFilter {
        InboundFilter::new(vec!["telemetry_exchange".to_string()], "w1")
    }

    fn frame(routing_key: &str, body: &str) -> Frame {
        Frame::new("telemetry_exchange", routing_key, body)
    }

    #[tokio::test]
    async fn ingest_enqueues_only_valid_frames() {
        let (handle, mut queues) = crate::queues::telemetry_queues();
        let frames = futures_util::stream::iter(vec![
            frame("telemetry.robot.7", ROBOT_BODY),
            frame("telemetry.robot.7", "{}"),
            frame("telemetry.pls.w1", PERSON_BODY),
            Frame::new("elsewhere", "telemetry.pls.w1", PERSON_BODY),
        ])
        .boxed();

        assert_eq!(ingest(frames, filter(), handle).await, 2);
        assert_eq!(queues.pending_robot(), 1);
        assert_eq!(queues.pending_personnel(), 1);
        assert_eq!(queues.pop_robot().map(|t| t.id), Some("7".to_string()));
    }

    #[tokio::test]
    async fn ingest_stops_when_consumer_is_dropped() {
        let (handle, queues) = crate::queues::telemetry_queues();
        drop(queues);
        let frames = futures_util::stream::iter(vec![
            frame("telemetry.robot.7", ROBOT_BODY),
            frame("telemetry.robot.7", ROBOT_BODY),
        ])
        .boxed();
        assert_eq!(ingest(frames, filter(), handle).await, 0);
    }

    #[test]
    fn routing_key_selects_kind() {
        assert_eq!(TelemetryKind::from_routing_key("telemetry.robot.7"), Some(TelemetryKind::Robot));
        assert_eq!(TelemetryKind::from_routing_key("site.telemetry.pls.w1"), Some(TelemetryKind::Personnel));
        assert_eq!(TelemetryKind::from_routing_key("control.robot.7"), None);
    }

    #[test]
    fn valid_robot_frame_is_accepted() {
        let message = filter().accept(&frame("telemetry.robot.7", ROBOT_BODY));
        let Some(InboundMessage::Robot(t)) = message else {
            panic!("expected robot telemetry");
        };
        assert_eq!(t.id, "7");
        assert_eq!(t.wrist.x, 2.0);
    }

    #[test]
    fn valid_personnel_frame_is_accepted() {
        let message = filter().accept(&frame("telemetry.pls.w1", PERSON_BODY));
        assert_eq!(message.as_ref().map(InboundMessage::kind), Some(TelemetryKind::Personnel));
        assert_eq!(message.as_ref().map(InboundMessage::id), Some("w1"));
    }

    #[test]
    fn missing_required_field_is_dropped() {
        let no_wrist = r#"{"id":"7","base":[0,0],"shoulder":[0,1],"elbow":[1,2]}"#;
        assert!(filter().accept(&frame("telemetry.robot.7", no_wrist)).is_none());

        let no_timestamp = r#"{"id":"w1","x_est_pos":1.0,"y_est_pos":2.0,"z_est_pos":0.0}"#;
        assert!(filter().accept(&frame("telemetry.pls.w1", no_timestamp)).is_none());
    }

    #[test]
    fn garbage_body_is_dropped() {
        assert!(filter().accept(&frame("telemetry.robot.7", "not json")).is_none());
    }

    #[test]
    fn routing_key_id_mismatch_is_dropped() {
        assert!(filter().accept(&frame("telemetry.robot.8", ROBOT_BODY)).is_none());
    }

    #[test]
    fn untracked_personnel_is_dropped() {
        let other = InboundFilter::new(vec!["telemetry_exchange".to_string()], "w2");
        assert!(other.accept(&frame("telemetry.pls.w1", PERSON_BODY)).is_none());
    }

    #[test]
    fn unsubscribed_exchange_is_dropped() {
        let f = Frame::new("elsewhere", "telemetry.robot.7", ROBOT_BODY);
        assert!(filter().accept(&f).is_none());
    }

    #[test]
    fn unknown_routing_key_is_dropped() {
        assert!(filter().accept(&frame("status.robot.7", ROBOT_BODY)).is_none());
    }
}
