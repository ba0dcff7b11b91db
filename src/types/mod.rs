//! Core protocol frame types.

mod frame;

pub use frame::{Entity, Frame, PlaybackDirection, StartCommand, StopCommand, Telemetry};
