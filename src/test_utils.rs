//! Test doubles shared by the unit test suites.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::liveness::CellProbe;
use crate::{Result, VerifyError};

/// Outbound payload for a plain single-stream start command.
pub(crate) fn start_payload(stream_id: &str, speed: f64) -> String {
    format!(r#"{{"method":"play","streamId":"{stream_id}","speed":{speed},"format":"mp4"}}"#)
}

/// Outbound payload for a stop command; pass a composite id to exercise
/// subsumption.
pub(crate) fn stop_payload(stream_id: &str) -> String {
    format!(r#"{{"method":"stop_video","streamId":"{stream_id}"}}"#)
}

/// A cell probe that replays a pre-scripted sequence of observations.
///
/// The final entry repeats once the script is exhausted, matching a real
/// cell whose display holds its last state.
pub(crate) struct ScriptedCell {
    label: String,
    timers: Mutex<Script<String>>,
    frames: Mutex<Script<Vec<u8>>>,
}

struct Script<T> {
    entries: Vec<T>,
    cursor: usize,
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self.cursor.min(self.entries.len() - 1);
        self.cursor += 1;
        Some(self.entries[index].clone())
    }
}

impl ScriptedCell {
    pub(crate) fn with_timers(label: &str, timers: Vec<String>) -> Self {
        Self {
            label: label.to_string(),
            timers: Mutex::new(Script { entries: timers, cursor: 0 }),
            frames: Mutex::new(Script { entries: Vec::new(), cursor: 0 }),
        }
    }

    pub(crate) fn with_frames(label: &str, frames: Vec<Vec<u8>>) -> Self {
        Self {
            label: label.to_string(),
            timers: Mutex::new(Script { entries: Vec::new(), cursor: 0 }),
            frames: Mutex::new(Script { entries: frames, cursor: 0 }),
        }
    }
}

#[async_trait]
impl CellProbe for ScriptedCell {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn timer_text(&self) -> Result<String> {
        self.timers
            .lock()
            .expect("scripted cell lock")
            .next()
            .ok_or_else(|| VerifyError::parse_error("scripted cell", "no timers scripted"))
    }

    async fn capture_frame(&self) -> Result<Vec<u8>> {
        self.frames
            .lock()
            .expect("scripted cell lock")
            .next()
            .ok_or_else(|| VerifyError::parse_error("scripted cell", "no frames scripted"))
    }

    async fn wait_until_playing(&self) -> Result<()> {
        Ok(())
    }
}
