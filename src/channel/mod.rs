//! Control channel observation layer.
//!
//! The browser-automation glue owns the actual WebSocket; it feeds every
//! outbound and inbound text payload into a [`ControlChannel`], which fans
//! the payloads out to any number of independent [`Subscription`]s in
//! delivery order. Dropping a subscription unsubscribes it, so every
//! correlation or quiescence wait cleans up on any exit path.


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, trace, warn};

/// Buffered payloads per direction before slow subscribers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Direction of a payload relative to the client under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Command frames the client is about to send.
    Sent,
    /// Telemetry frames the client received.
    Received,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Sent => f.write_str("sent"),
            Direction::Received => f.write_str("received"),
        }
    }
}

/// In-process fan-out hub for one control channel.
///
/// Payloads published while no subscription exists are dropped; observers
/// subscribe before driving the UI action they want to correlate.
#[derive(Debug)]
pub struct ControlChannel {
    sent_tx: broadcast::Sender<Arc<str>>,
    received_tx: broadcast::Sender<Arc<str>>,
    closed: AtomicBool,
}

impl ControlChannel {
    /// Create a channel hub with the default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a channel hub with an explicit per-direction buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sent_tx, _) = broadcast::channel(capacity);
        let (received_tx, _) = broadcast::channel(capacity);
        Self { sent_tx, received_tx, closed: AtomicBool::new(false) }
    }

    /// Publish a payload the client is about to send.
    ///
    /// Ignored once the channel is closed.
    pub fn publish_sent(&self, payload: impl Into<Arc<str>>) {
        self.publish(Direction::Sent, payload.into());
    }

    /// Publish a payload the client received.
    ///
    /// Ignored once the channel is closed.
    pub fn publish_received(&self, payload: impl Into<Arc<str>>) {
        self.publish(Direction::Received, payload.into());
    }

    fn publish(&self, direction: Direction, payload: Arc<str>) {
        if self.is_closed() {
            debug!(%direction, "Payload published after close, dropping");
            return;
        }
        trace!(%direction, len = payload.len(), "Publishing payload");
        let tx = match direction {
            Direction::Sent => &self.sent_tx,
            Direction::Received => &self.received_tx,
        };
        // Err means no live subscriber; observation simply has not started.
        let _ = tx.send(payload);
    }

    /// Subscribe to outbound (client-to-server) payloads.
    pub fn sent(&self) -> Subscription {
        Subscription { rx: self.sent_tx.subscribe(), direction: Direction::Sent }
    }

    /// Subscribe to inbound (server-to-client) payloads.
    pub fn received(&self) -> Subscription {
        Subscription { rx: self.received_tx.subscribe(), direction: Direction::Received }
    }

    /// Mark the channel closed. Later publishes are dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        debug!("Control channel closed");
    }

    /// Whether the underlying transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One observer's view of a channel direction.
///
/// Every subscription sees every payload published after it was created, in
/// delivery order, independently of any other subscription. Dropping the
/// subscription unsubscribes it.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Arc<str>>,
    direction: Direction,
}

impl Subscription {
    /// Next payload in delivery order.
    ///
    /// Returns `None` once the channel hub has been dropped; an explicitly
    /// closed channel keeps the subscription alive and simply stops
    /// emitting. A subscriber that fell behind the buffer skips the lost
    /// range with a warning and continues with the oldest retained payload.
    pub async fn next(&mut self) -> Option<Arc<str>> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(direction = %self.direction, skipped, "Subscription lagged, payloads dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Direction this subscription observes.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Adapt the subscription into a [`Stream`] of payloads.
    ///
    /// Lag is handled the same way as [`Subscription::next`]: logged and
    /// skipped.
    pub fn into_stream(self) -> impl Stream<Item = Arc<str>> + Send {
        let direction = self.direction;
        BroadcastStream::new(self.rx).filter_map(move |item| match item {
            Ok(payload) => Some(payload),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(%direction, skipped, "Subscription lagged, payloads dropped");
                None
            }
        })
    }
}
