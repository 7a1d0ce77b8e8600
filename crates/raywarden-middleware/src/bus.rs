//! Headless, topic-based publish/subscribe bus for transport frames.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every frame without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! Traffic is partitioned into two [`Topic`] lanes:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Telemetry`] | Inbound robot and personnel telemetry frames |
//! | [`Topic::Control`] | Outbound stop directives for robots |

use futures_util::stream::{self, BoxStream};
use raywarden_types::{Frame, RayError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered frames before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Frames arriving from telemetry producers.
    Telemetry,
    /// Frames leaving towards robot controllers.
    Control,
}

/// Shared frame bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    telemetry: broadcast::Sender<Frame>,
    control: broadcast::Sender<Frame>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (telemetry, _) = broadcast::channel(capacity);
        let (control, _) = broadcast::channel(capacity);
        Self { telemetry, control }
    }

    /// Publish `frame` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the frame.
    /// Returns `Ok(0)` when no subscribers are currently listening on the
    /// topic; a frame nobody listens to is simply gone.
    pub fn publish_to(&self, topic: Topic, frame: Frame) -> Result<usize, RayError> {
        let sender = self.topic_sender(topic);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(frame)
            .map_err(|e| RayError::Channel(format!("bus send error on {topic:?}: {e}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Frame> {
        match topic {
            Topic::Telemetry => &self.telemetry,
            Topic::Control => &self.control,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Frame>,
}

impl TopicReceiver {
    /// Wait for the next frame on this topic.
    ///
    /// Returns:
    /// * `Ok(frame)` – a successfully received frame.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` frames were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Frame, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Turn the receiver into a stream that skips over lag and ends when the
    /// bus closes.
    pub fn into_stream(self) -> BoxStream<'static, Frame> {
        Box::pin(stream::unfold(self, |mut rx| async move {
            loop {
                match rx.receiver.recv().await {
                    Ok(frame) => return Some((frame, rx)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(topic = ?rx.topic, lagged_by = n, "topic receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}
