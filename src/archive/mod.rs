//! Archive time model: compact timestamps, recording intervals and pointer
//! readouts.

pub mod pointer;
pub mod timecode;

pub use pointer::{PointerMotion, compare_pointer_positions, second_of_day, times_match};
pub use timecode::{
    ArchiveInterval, LocalInterval, LocalTimestamp, recording_gaps, to_compact, to_epoch_millis,
    transform_intervals,
};
