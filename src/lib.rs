//! Stream verification engine for video-management client tests.
//!
//! Playwatch observes the JSON control channel of a web video client,
//! correlates commands against declarative predicates, tracks the set of
//! in-flight streams, and independently verifies that playback is actually
//! advancing by polling observable UI state.
//!
//! # Features
//!
//! - **Protocol correlation**: await the first frame matching a predicate,
//!   with a hard timeout
//! - **Active stream tracking**: passive start/stop observation with bulk
//!   "nothing is playing" assertions
//! - **Liveness polling**: timer-text or frame-fingerprint sampling with
//!   stall debounce, for one cell or a concurrent grid
//! - **Archive time model**: compact timestamp codec, interval gaps and
//!   directional pointer comparison
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use playwatch::{
//!     ControlChannel, FramePredicate, LivenessStrategy, SessionConfig, VerifySession,
//!     Environment,
//! };
//!
//! # async fn scenario() -> playwatch::Result<()> {
//! let channel = Arc::new(ControlChannel::new());
//! // The automation glue feeds channel.publish_sent / publish_received
//! // from the browser's WebSocket hooks.
//! let session = VerifySession::begin(
//!     Arc::clone(&channel),
//!     SessionConfig::new(Environment::Local, LivenessStrategy::TimerText),
//! );
//!
//! // Drive a UI action externally, then correlate its protocol effect.
//! let frame = session
//!     .await_command(&FramePredicate::all(["\"speed\":1", "mp4"]))
//!     .await?;
//! assert!(frame.stream_id().is_some());
//! # Ok(())
//! # }
//! ```

// Core types and error handling
pub mod archive;
mod config;
mod error;
pub mod predicate;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod types;

// Channel observation and verification components
pub mod channel;
pub mod correlator;
pub mod liveness;
pub mod quiescence;
pub mod registry;

// Core exports
pub use archive::{
    ArchiveInterval, LocalInterval, LocalTimestamp, PointerMotion, compare_pointer_positions,
    recording_gaps, second_of_day, times_match, to_compact, to_epoch_millis, transform_intervals,
};
pub use config::{Environment, SessionConfig};
pub use error::{Result, VerifyError};
pub use predicate::FramePredicate;
pub use types::{Entity, Frame, PlaybackDirection, StartCommand, StopCommand, Telemetry};

// Component exports
pub use channel::{ControlChannel, Direction, Subscription};
pub use correlator::{DEFAULT_CORRELATION_TIMEOUT, await_matching_frame, await_matching_inbound};
pub use liveness::{CellProbe, LivenessPoller, LivenessStrategy, PlaybackState};
pub use quiescence::{QuiescenceConfig, assert_no_frames_received, wait_until_quiescent};
pub use registry::{ActiveStreamRegistry, RegistryConfig};

use std::sync::Arc;
use std::time::Duration;

/// One verification session over one control channel.
///
/// Owns the installed [`ActiveStreamRegistry`] and the session-wide
/// configuration, so scenario code correlates, asserts and verifies
/// through a single handle.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use playwatch::{ControlChannel, SessionConfig, VerifySession};
///
/// # async fn scenario() -> playwatch::Result<()> {
/// let channel = Arc::new(ControlChannel::new());
/// let session = VerifySession::begin(Arc::clone(&channel), SessionConfig::default());
/// session.registry().assert_none_active()?;
/// session.assert_transport_silent().await?;
/// # Ok(())
/// # }
/// ```
pub struct VerifySession {
    channel: Arc<ControlChannel>,
    registry: ActiveStreamRegistry,
    poller: LivenessPoller,
    config: SessionConfig,
}

impl VerifySession {
    /// Start observing `channel` with the given configuration.
    ///
    /// Installs a fresh stream registry; any previous observation state on
    /// a prior channel is discarded by that registry's own install.
    pub fn begin(channel: Arc<ControlChannel>, config: SessionConfig) -> Self {
        let registry = ActiveStreamRegistry::new();
        registry.install(&channel);
        let poller = LivenessPoller::new(config.strategy);
        Self { channel, registry, poller, config }
    }

    /// The observed control channel.
    pub fn channel(&self) -> &ControlChannel {
        &self.channel
    }

    /// The installed stream registry.
    pub fn registry(&self) -> &ActiveStreamRegistry {
        &self.registry
    }

    /// The session's liveness poller.
    pub fn poller(&self) -> &LivenessPoller {
        &self.poller
    }

    /// Session configuration in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Await the first outbound command matching `predicate`, under the
    /// session's correlation timeout.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when no matching frame arrives in time.
    pub async fn await_command(&self, predicate: &FramePredicate) -> Result<Frame> {
        await_matching_frame(&self.channel, predicate, self.config.correlation_timeout).await
    }

    /// Assert the transport stays silent, using the session's
    /// environment-derived settle and window.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedFrame` when any inbound frame arrives in the
    /// window.
    pub async fn assert_transport_silent(&self) -> Result<()> {
        assert_no_frames_received(&self.channel, self.config.quiescence).await
    }

    /// Verify a single cell with the session strategy.
    pub async fn verify_cell(
        &self,
        cell: &dyn CellProbe,
        duration: Duration,
        must_play: bool,
    ) -> Result<()> {
        self.poller.verify_one(cell, duration, must_play).await
    }

    /// Verify a grid of cells concurrently with the session strategy.
    pub async fn verify_cells(
        &self,
        cells: &[Arc<dyn CellProbe>],
        duration: Duration,
        must_play: bool,
    ) -> Result<()> {
        self.poller.verify_many(cells, duration, must_play).await
    }

    /// Stop observing and release the registry.
    pub fn end(self) {
        self.registry.teardown();
    }
}
