//! Active stream tracking.
//!
//! The registry passively observes outbound commands on one channel and
//! maintains the set of streams believed to be live: a stream is present
//! iff a start command for its id has been seen with no later stop whose
//! id subsumes it. The observer task is the only writer; assertions read
//! snapshots.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::channel::ControlChannel;
use crate::types::{Frame, StartCommand};
use crate::{Result, VerifyError};

/// Method markers for control traffic the registry never tracks
/// (token refresh and connection keep-alive chatter).
pub const DEFAULT_IGNORE_MARKERS: &[&str] = &["update_token", "keep_alive"];

/// Registry tuning knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Payload substrings that mark ignorable control traffic.
    pub ignore_markers: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { ignore_markers: DEFAULT_IGNORE_MARKERS.iter().map(|m| (*m).to_string()).collect() }
    }
}

/// Process-scoped table of currently playing streams.
///
/// Owned by the test-session scope; re-[`install`](Self::install)ing on a
/// new channel discards all prior state. Dropping the registry stops
/// observation.
#[derive(Debug)]
pub struct ActiveStreamRegistry {
    streams: Arc<Mutex<Vec<StartCommand>>>,
    ignore_markers: Arc<[String]>,
    observer: Mutex<CancellationToken>,
}

impl ActiveStreamRegistry {
    /// Create an idle registry with the default ignore markers.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an idle registry with explicit configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: Arc::new(Mutex::new(Vec::new())),
            ignore_markers: config.ignore_markers.into(),
            observer: Mutex::new(CancellationToken::new()),
        }
    }

    /// Begin observing outbound commands on `channel`.
    ///
    /// Clears the active set, tears down any previous observer and spawns a
    /// fresh one subscribed to the channel's outbound direction.
    pub fn install(&self, channel: &ControlChannel) {
        let cancel = CancellationToken::new();
        {
            let mut observer = lock(&self.observer);
            observer.cancel();
            *observer = cancel.clone();
        }
        lock(&self.streams).clear();

        let stream = channel.sent().into_stream();
        let streams = Arc::clone(&self.streams);
        let ignore_markers = Arc::clone(&self.ignore_markers);
        tokio::spawn(async move {
            debug!("Stream observer installed");
            let mut payloads = std::pin::pin!(stream);
            loop {
                let payload = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    payload = payloads.next() => match payload {
                        Some(payload) => payload,
                        None => break,
                    },
                };
                observe(&streams, &ignore_markers, &payload);
            }
            debug!("Stream observer stopped");
        });
    }

    /// Stop observing. The current snapshot stays readable.
    pub fn teardown(&self) {
        lock(&self.observer).cancel();
    }

    /// Copy of the active set, most-recent-first.
    pub fn snapshot(&self) -> Vec<StartCommand> {
        lock(&self.streams).clone()
    }

    /// Number of streams currently believed live.
    pub fn len(&self) -> usize {
        lock(&self.streams).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.streams).is_empty()
    }

    /// Most recent active entry for `stream_id`, if any.
    pub fn find(&self, stream_id: &str) -> Option<StartCommand> {
        lock(&self.streams).iter().find(|entry| entry.stream_id == stream_id).cloned()
    }

    /// Bulk assertion that no stream is currently active.
    ///
    /// # Errors
    ///
    /// Returns `StreamsStillActive` naming the lingering ids.
    pub fn assert_none_active(&self) -> Result<()> {
        let streams = lock(&self.streams);
        if streams.is_empty() {
            return Ok(());
        }
        let stream_ids: Vec<&str> = streams.iter().map(|entry| entry.stream_id.as_str()).collect();
        Err(VerifyError::StreamsStillActive {
            count: streams.len(),
            stream_ids: stream_ids.join(", "),
        })
    }
}

impl Default for ActiveStreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActiveStreamRegistry {
    fn drop(&mut self) {
        lock(&self.observer).cancel();
    }
}

/// Single message-handling step, in channel delivery order.
fn observe(streams: &Mutex<Vec<StartCommand>>, ignore_markers: &[String], payload: &str) {
    if ignore_markers.iter().any(|marker| payload.contains(marker.as_str())) {
        trace!("Ignoring control traffic");
        return;
    }
    let frame = match Frame::decode(payload) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(%error, "Undecodable outbound payload, skipping");
            return;
        }
    };
    let mut streams = lock(streams);
    match frame {
        Frame::Stop(stop) => {
            // The stop id subsumes every child id it contains, itself
            // included, so a matched start/stop pair leaves nothing behind.
            let before = streams.len();
            streams.retain(|entry| !stop.subsumes(&entry.stream_id));
            debug!(
                stream_id = %stop.stream_id,
                removed = before - streams.len(),
                remaining = streams.len(),
                "Stop observed"
            );
        }
        Frame::Start(start) => {
            trace!(stream_id = %start.stream_id, "Start observed");
            streams.insert(0, start);
        }
        Frame::Telemetry(_) => {
            trace!("Outbound telemetry, not tracked");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
