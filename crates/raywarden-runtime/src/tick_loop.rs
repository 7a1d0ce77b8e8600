//! [`TickLoop`] – the fixed-order cycle that keeps a work area safe.
//!
//! Each tick:
//!
//! 1. **Robot apply** – pop at most one robot message and move that robot's
//!    limb lines.
//! 2. **Personnel apply and range** – pop at most one personnel message,
//!    move the particle, then run a ranging and classification pass. With no
//!    personnel message the pass is skipped and nothing is reclassified.
//! 3. **Publish** – deduplicate the robot directives from step 2 and send
//!    each through the [`Transport`].
//!
//! [`TickLoop::run`] adds pacing: sleep for the configured interval, or only
//! yield when the interval is unset.
//!
//! Bursts accumulate in the queues; a tick never does more than two pops and
//! one ranging pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use raywarden_middleware::{BusTransport, EventBus};
//! use raywarden_runtime::tick_loop::TickLoop;
//! # fn demo(workarea: raywarden_types::config::WorkareaConfig) -> Result<(), raywarden_types::RayError> {
//! let publisher = workarea
//!     .protocol
//!     .as_ref()
//!     .and_then(|p| p.control_publisher())
//!     .cloned()
//!     .ok_or_else(|| raywarden_types::RayError::Config("no control publisher".into()))?;
//! let transport = Arc::new(BusTransport::new(Arc::new(EventBus::default()), publisher));
//! let (tick_loop, ingest_handle) = TickLoop::from_config(&workarea, "worker_1", transport)?;
//! # let _ = (tick_loop, ingest_handle);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use raywarden_kernel::{CollisionDetector, dedup_directives};
use raywarden_middleware::Transport;
use raywarden_types::config::WorkareaConfig;
use raywarden_types::{RayError, StopDirective};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::queues::{IngestHandle, TelemetryQueues, telemetry_queues};

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// A robot message was popped and applied.
    pub robot_applied: bool,
    /// A personnel message was popped and a ranging pass ran.
    pub ranged: bool,
    /// Directives sent during the publish phase.
    pub published: Vec<StopDirective>,
}

/// One work area's collision engine.
pub struct TickLoop {
    workarea_id: String,
    detector: CollisionDetector,
    queues: TelemetryQueues,
    transport: Arc<dyn Transport>,
    interval: Option<Duration>,
    ticks: u64,
}

impl TickLoop {
    pub fn new(
        workarea_id: impl Into<String>,
        detector: CollisionDetector,
        queues: TelemetryQueues,
        transport: Arc<dyn Transport>,
        interval: Option<Duration>,
    ) -> Self {
        Self {
            workarea_id: workarea_id.into(),
            detector,
            queues,
            transport,
            interval,
            ticks: 0,
        }
    }

    /// Seed a tick loop from configuration and return it with the producer
    /// side of its queues.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::InvalidGeometry`] if the scene cannot be seeded.
    pub fn from_config(
        workarea: &WorkareaConfig,
        personnel_id: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<(Self, IngestHandle), RayError> {
        let detector = CollisionDetector::from_config(workarea, personnel_id)?;
        let (handle, queues) = telemetry_queues();
        let tick_loop = Self::new(
            workarea.id.clone(),
            detector,
            queues,
            transport,
            workarea.attribute.tick_interval(),
        );
        Ok((tick_loop, handle))
    }

    pub fn workarea_id(&self) -> &str {
        &self.workarea_id
    }

    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    pub fn queues(&self) -> &TelemetryQueues {
        &self.queues
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick without pacing.
    ///
    /// # Errors
    ///
    /// A serialization or transport failure aborts the tick and is returned
    /// to the caller; there is no retry.
    #[instrument(skip(self), fields(workarea = %self.workarea_id, tick = self.ticks))]
    pub async fn tick(&mut self) -> Result<TickOutcome, RayError> {
        let mut outcome = TickOutcome::default();

        if let Some(robot) = self.queues.pop_robot() {
            debug!(robot_id = %robot.id, "applying robot telemetry");
            self.detector.update_robot(&robot)?;
            outcome.robot_applied = true;
        }

        let mut directives = Vec::new();
        if let Some(person) = self.queues.pop_personnel() {
            self.detector.update_particle(person.x_est_pos, person.y_est_pos);
            directives = self.detector.ranging().robot;
            outcome.ranged = true;
        }

        for directive in dedup_directives(directives) {
            let payload = serde_json::to_string(&directive)
                .map_err(|e| RayError::Serialization(e.to_string()))?;
            self.transport.publish(payload, Some(&directive.id)).await?;
            info!(robot_id = %directive.id, "stop directive published");
            outcome.published.push(directive);
        }

        self.ticks += 1;
        Ok(outcome)
    }

    /// Wait out the configured interval.
    pub async fn pace(&self) {
        match self.interval {
            Some(interval) => tokio::time::sleep(interval).await,
            None => tokio::task::yield_now().await,
        }
    }

    /// Tick and pace until `shutdown` turns `true` or its sender goes away.
    ///
    /// # Errors
    ///
    /// Returns the first failed tick's error.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), RayError> {
        self.transport.connect().await?;
        info!(workarea = %self.workarea_id, interval = ?self.interval, "tick loop started");

        while !*shutdown.borrow() {
            self.tick().await?;
            tokio::select! {
                _ = self.pace() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(workarea = %self.workarea_id, ticks = self.ticks, "tick loop stopped");
        Ok(())
    }
}
