//! Compact timestamp codec and recording-interval arithmetic.
//!
//! The wire encodes instants as `YYYYMMDD"T"hhmmss[.fff]` with no zone
//! marker: implicitly UTC on the wire, local time for displayed pointers.
//! Fields sit at fixed offsets, so decoding slices rather than scans.
//! Malformed input is a caller contract violation and surfaces as a
//! `Parse` error; there is no recovery path.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, VerifyError};

/// One contiguous recorded segment for a camera/archive pair.
///
/// Interval lists are chronological and non-overlapping; the space between
/// consecutive intervals is a recording outage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveInterval {
    pub begin: String,
    pub end: String,
}

/// A compact timestamp broken out into viewer-local calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
}

/// An [`ArchiveInterval`] converted to viewer-local calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalInterval {
    pub begin: LocalTimestamp,
    pub end: LocalTimestamp,
}

/// Format an instant into the compact wire representation.
pub fn to_compact(instant: &DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%S").to_string()
}

/// Epoch milliseconds for a compact timestamp.
///
/// Sub-second digits are preserved when present; a bare `hhmmss` tail is
/// read as `.000`.
///
/// # Errors
///
/// Returns a `Parse` error for input that does not match the fixed layout.
pub fn to_epoch_millis(compact: &str) -> Result<i64> {
    Ok(parse_compact(compact)?.timestamp_millis())
}

/// Fold a timezone offset into each interval's begin/end fields.
///
/// `tz_offset_hours` uses the display layer's sign convention (the JS
/// `getTimezoneOffset` one): UTC+2 reports `-2`. The offset is subtracted
/// from the encoded hour; the day rolls forward or backward when the
/// adjusted hour leaves `[0, 24)`. Only whole-hour offsets are in contract.
pub fn transform_intervals(
    intervals: &[ArchiveInterval],
    tz_offset_hours: i32,
) -> Result<Vec<LocalInterval>> {
    intervals
        .iter()
        .map(|interval| {
            Ok(LocalInterval {
                begin: to_local(&interval.begin, tz_offset_hours)?,
                end: to_local(&interval.end, tz_offset_hours)?,
            })
        })
        .collect()
}

/// Millisecond gaps between consecutive intervals (recording outages).
///
/// Returns one entry per boundary, so an empty or single-interval list
/// produces no gaps.
pub fn recording_gaps(intervals: &[ArchiveInterval]) -> Result<Vec<i64>> {
    intervals
        .windows(2)
        .map(|pair| Ok(to_epoch_millis(&pair[1].begin)? - to_epoch_millis(&pair[0].end)?))
        .collect()
}

fn to_local(compact: &str, tz_offset_hours: i32) -> Result<LocalTimestamp> {
    let shifted = parse_compact(compact)? - TimeDelta::hours(i64::from(tz_offset_hours));
    Ok(LocalTimestamp {
        year: shifted.year(),
        month: shifted.month(),
        day: shifted.day(),
        hours: shifted.hour(),
        minutes: shifted.minute(),
        seconds: shifted.second(),
        milliseconds: shifted.timestamp_subsec_millis(),
    })
}

pub(crate) fn parse_compact(compact: &str) -> Result<DateTime<Utc>> {
    if compact.len() < 15 || compact.as_bytes()[8] != b'T' {
        return Err(VerifyError::parse_error(
            "compact timestamp",
            format!("'{compact}' does not match YYYYMMDDThhmmss[.fff]"),
        ));
    }

    let year = digits(compact, 0..4)? as i32;
    let month = digits(compact, 4..6)?;
    let day = digits(compact, 6..8)?;
    let hour = digits(compact, 9..11)?;
    let minute = digits(compact, 11..13)?;
    let second = digits(compact, 13..15)?;
    let millis = subsecond_millis(compact)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, second, millis))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            VerifyError::parse_error(
                "compact timestamp",
                format!("'{compact}' encodes an out-of-range calendar value"),
            )
        })
}

fn digits(compact: &str, range: std::ops::Range<usize>) -> Result<u32> {
    let slice = compact.get(range.clone()).ok_or_else(|| {
        VerifyError::parse_error("compact timestamp", format!("'{compact}' is truncated"))
    })?;
    slice.parse().map_err(|_| {
        VerifyError::parse_error(
            "compact timestamp",
            format!("non-digit characters at {}..{} in '{compact}'", range.start, range.end),
        )
    })
}

/// Sub-second digits are optional; `len > 16` means a `.fff` tail is
/// present. Shorter fractions are right-padded, longer ones truncated to
/// millisecond precision.
fn subsecond_millis(compact: &str) -> Result<u32> {
    if compact.len() <= 16 {
        return Ok(0);
    }
    if compact.as_bytes()[15] != b'.' {
        return Err(VerifyError::parse_error(
            "compact timestamp",
            format!("expected '.' before sub-second digits in '{compact}'"),
        ));
    }
    let fraction = &compact[16..];
    let truncated = &fraction[..fraction.len().min(3)];
    let padded = format!("{truncated:0<3}");
    padded.parse().map_err(|_| {
        VerifyError::parse_error(
            "compact timestamp",
            format!("non-digit sub-second characters in '{compact}'"),
        )
    })
}
