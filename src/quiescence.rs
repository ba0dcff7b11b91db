//! Transport-silence assertions.
//!
//! After a stop or pause, the control channel should fall silent, not just
//! the UI. The check waits out a settle period so in-flight frames can
//! drain, then listens for a bounded window and fails on the first inbound
//! frame. The settle and window durations are configuration inputs; the
//! only environment sensitivity is the longer drain cloud targets need.

use std::time::Duration;

use futures::StreamExt;
use tracing::debug;

use crate::channel::ControlChannel;
use crate::config::Environment;
use crate::{Result, VerifyError};

/// Settle period for locally hosted targets.
pub const LOCAL_SETTLE: Duration = Duration::from_secs(2);
/// Settle period for cloud-hosted targets, which drain more slowly.
pub const CLOUD_SETTLE: Duration = Duration::from_secs(10);
/// Length of the silence window itself.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(2);

/// Timing for one quiescence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiescenceConfig {
    /// How long to let in-flight traffic drain before listening.
    pub settle: Duration,
    /// How long the channel must stay silent.
    pub window: Duration,
}

impl QuiescenceConfig {
    pub fn for_environment(environment: Environment) -> Self {
        let settle = if environment.is_cloud() { CLOUD_SETTLE } else { LOCAL_SETTLE };
        Self { settle, window: DEFAULT_WINDOW }
    }
}

impl Default for QuiescenceConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Local)
    }
}

/// Assert that no inbound frame arrives within the configured window.
///
/// # Errors
///
/// Returns `UnexpectedFrame` carrying the offending payload when the
/// channel is not quiescent. A channel that closes during the window stops
/// emitting and counts as silent.
pub async fn assert_no_frames_received(
    channel: &ControlChannel,
    config: QuiescenceConfig,
) -> Result<()> {
    debug!(settle = ?config.settle, "Letting in-flight traffic drain");
    tokio::time::sleep(config.settle).await;

    debug!(window = ?config.window, "Listening for inbound frames");
    let inbound = channel.received().into_stream();
    futures::pin_mut!(inbound);
    match tokio::time::timeout(config.window, inbound.next()).await {
        Ok(Some(payload)) => Err(VerifyError::UnexpectedFrame {
            payload: payload.to_string(),
            window: config.window,
        }),
        Ok(None) | Err(_) => Ok(()),
    }
}

/// [`assert_no_frames_received`] with explicit durations.
///
/// Convenience for call sites that size the settle and window per scenario
/// rather than per environment.
pub async fn wait_until_quiescent(
    channel: &ControlChannel,
    settle: Duration,
    window: Duration,
) -> Result<()> {
    assert_no_frames_received(channel, QuiescenceConfig { settle, window }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn silent_window_passes() {
        let channel = ControlChannel::new();
        assert_no_frames_received(&channel, QuiescenceConfig::default()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_frame_during_window_fails() {
        let channel = Arc::new(ControlChannel::new());
        let config = QuiescenceConfig { settle: Duration::from_millis(100), window: DEFAULT_WINDOW };

        let feeder = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                // Past the settle period, inside the listen window.
                tokio::time::sleep(Duration::from_millis(500)).await;
                channel.publish_received(r#"{"tick":42}"#);
            })
        };

        let error = assert_no_frames_received(&channel, config).await.unwrap_err();
        feeder.await.unwrap();

        assert!(matches!(error, VerifyError::UnexpectedFrame { .. }));
        assert!(error.to_string().contains("tick"));
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_during_settle_is_tolerated() {
        let channel = Arc::new(ControlChannel::new());
        let config =
            QuiescenceConfig { settle: Duration::from_secs(1), window: Duration::from_secs(1) };

        let feeder = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                // Still draining: published before the window opens.
                tokio::time::sleep(Duration::from_millis(200)).await;
                channel.publish_received(r#"{"tick":1}"#);
            })
        };

        assert_no_frames_received(&channel, config).await.unwrap();
        feeder.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn channel_closed_during_window_counts_as_silent() {
        let channel = Arc::new(ControlChannel::new());
        let config =
            QuiescenceConfig { settle: Duration::from_millis(10), window: Duration::from_secs(2) };

        let closer = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                channel.close();
            })
        };

        assert_no_frames_received(&channel, config).await.unwrap();
        closer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_durations_flow_through() {
        let channel = ControlChannel::new();
        wait_until_quiescent(&channel, Duration::from_millis(50), Duration::from_millis(200))
            .await
            .unwrap();
    }
}
