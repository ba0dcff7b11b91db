//! Playback liveness detection.
//!
//! Whether a cell is actually playing cannot be read off the protocol
//! alone; the poller samples an observable proxy (the displayed clock or a
//! fingerprint of the rendered surface) at a fixed cadence and applies a
//! consecutive-no-change debounce so single noisy samples do not flip the
//! verdict. One verification call produces one terminal judgement.

mod probe;

pub use probe::CellProbe;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::archive::pointer::second_of_day;
use crate::{Result, VerifyError};

/// Sampling cadence for the timer-text strategy.
pub const TIMER_TICK: Duration = Duration::from_secs(1);
/// Sampling cadence for the frame-fingerprint strategy.
pub const FRAME_TICK: Duration = Duration::from_millis(500);
/// Consecutive unchanged samples that conclude a stall.
pub const STALL_THRESHOLD: u32 = 3;
/// Byte-length slack treated as "unchanged" under inexact fingerprinting,
/// absorbing encoder jitter between visually identical frames.
pub const FRAME_JITTER_TOLERANCE: usize = 50;
/// Layouts at or above this cell count force exact fingerprinting: with
/// denser grids the per-cell surface shrinks until compression noise
/// swamps the length heuristic.
pub const EXACT_FINGERPRINT_CELL_COUNT: usize = 12;

/// How a cell's "currently advancing" signal is sampled.
///
/// Chosen once per session from environment capability (a runtime that
/// cannot decode the stream codec has no timer to read) and passed down as
/// a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessStrategy {
    /// Read the displayed clock and compare second-of-day values.
    TimerText,
    /// Fingerprint the rendered surface; `exact` requires bit-identical
    /// captures, otherwise byte length within the jitter tolerance counts
    /// as unchanged.
    FrameFingerprint { exact: bool },
}

impl LivenessStrategy {
    /// Sampling cadence for this strategy.
    pub fn tick(self) -> Duration {
        match self {
            LivenessStrategy::TimerText => TIMER_TICK,
            LivenessStrategy::FrameFingerprint { .. } => FRAME_TICK,
        }
    }

    /// Strategy actually applied for a layout of `cell_count` cells.
    fn for_cell_count(self, cell_count: usize) -> Self {
        match self {
            LivenessStrategy::FrameFingerprint { .. }
                if cell_count >= EXACT_FINGERPRINT_CELL_COUNT =>
            {
                LivenessStrategy::FrameFingerprint { exact: true }
            }
            other => other,
        }
    }
}

/// Terminal judgement of one verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Stalled,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => f.write_str("playing"),
            PlaybackState::Stalled => f.write_str("stalled"),
        }
    }
}

/// One observed sample of a cell's liveness proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sample {
    Seconds(u32),
    Fingerprint(Vec<u8>),
}

impl Sample {
    fn unchanged_from(&self, previous: &Sample, strategy: LivenessStrategy) -> bool {
        match (previous, self) {
            (Sample::Seconds(a), Sample::Seconds(b)) => a == b,
            (Sample::Fingerprint(a), Sample::Fingerprint(b)) => match strategy {
                LivenessStrategy::FrameFingerprint { exact: true } => a == b,
                _ => a.len().abs_diff(b.len()) <= FRAME_JITTER_TOLERANCE,
            },
            // A strategy never mixes sample kinds within one call.
            _ => false,
        }
    }
}

/// Samples cells and concludes playing vs. stalled.
#[derive(Debug, Clone, Copy)]
pub struct LivenessPoller {
    strategy: LivenessStrategy,
}

impl LivenessPoller {
    pub fn new(strategy: LivenessStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> LivenessStrategy {
        self.strategy
    }

    /// Sample `cell` for `duration` and conclude its playback state.
    ///
    /// One sample is taken per strategy tick across the window. Three
    /// consecutive unchanged samples conclude [`PlaybackState::Stalled`]
    /// immediately; a window that ends without tripping the debounce
    /// concludes [`PlaybackState::Playing`].
    pub async fn observe(&self, cell: &dyn CellProbe, duration: Duration) -> Result<PlaybackState> {
        let tick = self.strategy.tick();
        let samples = (duration.as_millis() / tick.as_millis()).max(1) as u32;
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(cell = %cell.label(), samples, ?tick, "Sampling cell");
        let mut previous: Option<Sample> = None;
        let mut unchanged_run = 0u32;
        for _ in 0..samples {
            interval.tick().await;
            let sample = self.sample(cell).await?;
            if let Some(previous) = &previous {
                if sample.unchanged_from(previous, self.strategy) {
                    unchanged_run += 1;
                    trace!(cell = %cell.label(), unchanged_run, "Sample unchanged");
                    if unchanged_run >= STALL_THRESHOLD {
                        debug!(cell = %cell.label(), "Stall debounce tripped");
                        return Ok(PlaybackState::Stalled);
                    }
                } else {
                    unchanged_run = 0;
                }
            }
            previous = Some(sample);
        }
        Ok(PlaybackState::Playing)
    }

    async fn sample(&self, cell: &dyn CellProbe) -> Result<Sample> {
        match self.strategy {
            LivenessStrategy::TimerText => {
                let readout = cell.timer_text().await?;
                Ok(Sample::Seconds(second_of_day(&readout)?))
            }
            LivenessStrategy::FrameFingerprint { .. } => {
                Ok(Sample::Fingerprint(cell.capture_frame().await?))
            }
        }
    }

    /// Verify one cell against an expectation.
    ///
    /// When `must_play` is set the call first waits for the cell's "now
    /// playing" indicator, then samples. The concluded state must equal the
    /// expectation; one call is one terminal judgement, with no retries.
    ///
    /// # Errors
    ///
    /// Returns `Liveness` naming the cell and the expected vs. observed
    /// state on mismatch.
    pub async fn verify_one(
        &self,
        cell: &dyn CellProbe,
        duration: Duration,
        must_play: bool,
    ) -> Result<()> {
        if must_play {
            trace!(cell = %cell.label(), "Waiting for playing indicator");
            cell.wait_until_playing().await?;
        }
        let observed = self.observe(cell, duration).await?;
        let expected = if must_play { PlaybackState::Playing } else { PlaybackState::Stalled };
        if observed == expected {
            Ok(())
        } else {
            Err(VerifyError::Liveness { cell: cell.label(), expected, observed })
        }
    }

    /// Verify a set of cells concurrently against one shared expectation.
    pub async fn verify_many(
        &self,
        cells: &[Arc<dyn CellProbe>],
        duration: Duration,
        must_play: bool,
    ) -> Result<()> {
        let expectations: Vec<(Arc<dyn CellProbe>, bool)> =
            cells.iter().map(|cell| (Arc::clone(cell), must_play)).collect();
        self.verify_each(&expectations, duration).await
    }

    /// Verify a set of cells concurrently, each against its own expectation.
    ///
    /// All cells are sampled in parallel (one suspension per cell, joined
    /// together); every evaluation runs to its own conclusion and the first
    /// failing cell's error is returned. Layouts of
    /// [`EXACT_FINGERPRINT_CELL_COUNT`] cells or more force exact
    /// fingerprinting when the session strategy is fingerprint-based.
    pub async fn verify_each(
        &self,
        expectations: &[(Arc<dyn CellProbe>, bool)],
        duration: Duration,
    ) -> Result<()> {
        let poller = Self::new(self.strategy.for_cell_count(expectations.len()));
        debug!(cells = expectations.len(), strategy = ?poller.strategy, "Verifying cell set");

        let checks = expectations.iter().map(|(cell, must_play)| {
            let cell = Arc::clone(cell);
            let must_play = *must_play;
            async move { poller.verify_one(cell.as_ref(), duration, must_play).await }
        });
        let results = futures::future::join_all(checks).await;
        for result in results {
            result?;
        }
        Ok(())
    }
}
