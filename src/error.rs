//! Error types for stream verification.
//!
//! All failures surface immediately to the invoking scenario; nothing here
//! is fatal to the process. The taxonomy separates time-budget expiries
//! (retryable by an outer scenario) from assertion mismatches and caller
//! contract violations (not retryable).

use std::time::Duration;
use thiserror::Error;

use crate::archive::pointer::PointerMotion;
use crate::liveness::PlaybackState;

/// Result type alias for verification operations.
pub type Result<T, E = VerifyError> = std::result::Result<T, E>;

/// Main error type for stream verification operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VerifyError {
    #[error("No frame matching [{predicate}] observed within {duration:?}")]
    Timeout { predicate: String, duration: Duration },

    #[error("Inbound frame during a {window:?} quiescence window: {payload}")]
    UnexpectedFrame { payload: String, window: Duration },

    #[error("Cell '{cell}': expected {expected}, observed {observed}")]
    Liveness { cell: String, expected: PlaybackState, observed: PlaybackState },

    #[error("Pointer did not move {expected}: start '{start}', last '{last}'")]
    PointerMismatch { start: String, last: String, expected: PointerMotion },

    #[error("{count} stream(s) still active: [{stream_ids}]")]
    StreamsStillActive { count: usize, stream_ids: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },
}

impl VerifyError {
    /// Returns whether an outer scenario may reasonably retry the failed check.
    ///
    /// Time-budget expiries depend on transient channel activity and can be
    /// retried; assertion mismatches and malformed input are terminal
    /// judgements about the observed session.
    pub fn is_retryable(&self) -> bool {
        match self {
            VerifyError::Timeout { .. } => true,
            VerifyError::UnexpectedFrame { .. } => true,
            VerifyError::Liveness { .. } => false,
            VerifyError::PointerMismatch { .. } => false,
            VerifyError::StreamsStillActive { .. } => false,
            VerifyError::Parse { .. } => false,
        }
    }

    /// Helper constructor for correlation timeouts.
    pub fn timeout(predicate: impl Into<String>, duration: Duration) -> Self {
        VerifyError::Timeout { predicate: predicate.into(), duration }
    }

    /// Helper constructor for parse errors with context.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        VerifyError::Parse { context: context.into(), details: details.into() }
    }
}
