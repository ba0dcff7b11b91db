//! Archive pointer comparison.
//!
//! The client renders the archive playback position as an `hh:mm:ss`
//! readout. Comparisons work on second-of-day, which assumes both samples
//! were taken on the same day: a playback session that straddles midnight
//! can fail a forward check spuriously. That limitation is inherited from
//! the display format (no date component) and is deliberately not patched.

use crate::{Result, VerifyError};

/// Expected motion between two pointer readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMotion {
    /// Playback advanced: the later reading is strictly greater.
    Forward,
    /// Playback runs backward: the later reading is strictly smaller.
    Reverse,
    /// Playback is parked: both readings are equal.
    Exact,
}

impl std::fmt::Display for PointerMotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointerMotion::Forward => f.write_str("forward"),
            PointerMotion::Reverse => f.write_str("reverse"),
            PointerMotion::Exact => f.write_str("exactly"),
        }
    }
}

/// Convert an `hh:mm:ss` display string to an integer second-of-day.
///
/// # Errors
///
/// Returns a `Parse` error when the readout does not have three numeric
/// colon-separated fields.
pub fn second_of_day(readout: &str) -> Result<u32> {
    let fields: Vec<&str> = readout.trim().split(':').collect();
    let [hours, minutes, seconds] = fields.as_slice() else {
        return Err(VerifyError::parse_error(
            "pointer readout",
            format!("'{readout}' is not hh:mm:ss"),
        ));
    };
    let parse = |field: &str| {
        field.parse::<u32>().map_err(|_| {
            VerifyError::parse_error("pointer readout", format!("non-digit field in '{readout}'"))
        })
    };
    Ok(parse(hours)? * 3600 + parse(minutes)? * 60 + parse(seconds)?)
}

/// Assert that the pointer moved the expected way between two readings.
///
/// # Errors
///
/// Returns `PointerMismatch` when the readings do not satisfy the expected
/// motion, or a `Parse` error for malformed readouts.
pub fn compare_pointer_positions(start: &str, last: &str, motion: PointerMotion) -> Result<()> {
    let start_seconds = second_of_day(start)?;
    let last_seconds = second_of_day(last)?;
    let holds = match motion {
        PointerMotion::Forward => start_seconds < last_seconds,
        PointerMotion::Reverse => start_seconds > last_seconds,
        PointerMotion::Exact => start_seconds == last_seconds,
    };
    if holds {
        Ok(())
    } else {
        Err(VerifyError::PointerMismatch {
            start: start.to_string(),
            last: last.to_string(),
            expected: motion,
        })
    }
}

/// Fuzzy equality for human-rendered clocks that round or truncate.
///
/// True iff `received` falls within `tolerance_seconds` of `expected`,
/// inclusive on both sides.
pub fn times_match(expected: &str, received: &str, tolerance_seconds: u32) -> Result<bool> {
    let expected_seconds = i64::from(second_of_day(expected)?);
    let received_seconds = i64::from(second_of_day(received)?);
    Ok((received_seconds - expected_seconds).abs() <= i64::from(tolerance_seconds))
}
