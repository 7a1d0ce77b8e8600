//! Ingestion queues between the transport and the tick loop.
//!
//! Two FIFO lanes, robot and personnel, backed by unbounded Tokio mpsc
//! channels. Producers hold a cloneable [`IngestHandle`]; the tick loop owns
//! the single [`TelemetryQueues`] consumer and calls each `pop_*` at most
//! once per tick. Queue depth is not bounded.

use raywarden_types::{PersonnelTelemetry, RayError, RobotTelemetry};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::warn;

use crate::inbound::InboundMessage;

/// Create a linked producer/consumer pair.
pub fn telemetry_queues() -> (IngestHandle, TelemetryQueues) {
    let (robot_tx, robot_rx) = mpsc::unbounded_channel();
    let (personnel_tx, personnel_rx) = mpsc::unbounded_channel();
    (
        IngestHandle {
            robot: robot_tx,
            personnel: personnel_tx,
        },
        TelemetryQueues {
            robot: robot_rx,
            personnel: personnel_rx,
        },
    )
}

/// Producer side. Enqueueing never blocks.
#[derive(Debug, Clone)]
pub struct IngestHandle {
    robot: UnboundedSender<RobotTelemetry>,
    personnel: UnboundedSender<PersonnelTelemetry>,
}

impl IngestHandle {
    /// # Errors
    ///
    /// Returns [`RayError::Channel`] once the consumer has been dropped.
    pub fn push_robot(&self, telemetry: RobotTelemetry) -> Result<(), RayError> {
        self.robot
            .send(telemetry)
            .map_err(|_| RayError::Channel("robot queue closed".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`RayError::Channel`] once the consumer has been dropped.
    pub fn push_personnel(&self, telemetry: PersonnelTelemetry) -> Result<(), RayError> {
        self.personnel
            .send(telemetry)
            .map_err(|_| RayError::Channel("personnel queue closed".to_string()))
    }

    /// Route a validated message to its lane.
    pub fn push(&self, message: InboundMessage) -> Result<(), RayError> {
        match message {
            InboundMessage::Robot(t) => self.push_robot(t),
            InboundMessage::Personnel(t) => self.push_personnel(t),
        }
    }

    /// Whether the consumer is gone.
    pub fn is_closed(&self) -> bool {
        self.robot.is_closed() || self.personnel.is_closed()
    }
}

/// Consumer side, owned by the tick loop.
#[derive(Debug)]
pub struct TelemetryQueues {
    robot: UnboundedReceiver<RobotTelemetry>,
    personnel: UnboundedReceiver<PersonnelTelemetry>,
}

impl TelemetryQueues {
    /// Oldest queued robot message, if any.
    pub fn pop_robot(&mut self) -> Option<RobotTelemetry> {
        pop_one(&mut self.robot, "robot")
    }

    /// Oldest queued personnel message, if any.
    pub fn pop_personnel(&mut self) -> Option<PersonnelTelemetry> {
        pop_one(&mut self.personnel, "personnel")
    }

    pub fn pending_robot(&self) -> usize {
        self.robot.len()
    }

    pub fn pending_personnel(&self) -> usize {
        self.personnel.len()
    }
}

fn pop_one<T>(rx: &mut UnboundedReceiver<T>, lane: &str) -> Option<T> {
    match rx.try_recv() {
        Ok(item) => Some(item),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            warn!(lane, "ingestion queue has no producers left");
            None
        }
    }
}
