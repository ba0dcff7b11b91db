//! Protocol frame decoding.
//!
//! The control channel carries JSON text frames. Decoding classifies each
//! payload once into a tagged [`Frame`] so assertions downstream work with
//! typed fields instead of re-probing raw JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Result, VerifyError};

/// Marker embedded in the `method` of stream-teardown commands.
const STOP_MARKER: &str = "stop";

/// A decoded control-channel message.
///
/// Classification happens at decode time, keyed by detectable shape: a
/// `method` embedding the stop marker is a [`StopCommand`]; any other
/// payload carrying a stream id is a [`StartCommand`]; everything else is
/// passed through as [`Telemetry`].
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Start(StartCommand),
    Stop(StopCommand),
    Telemetry(Telemetry),
}

/// A command that begins (or re-speeds) one logical stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StartCommand {
    pub method: String,
    /// Opaque id, stable for the lifetime of one play session and unique
    /// across concurrently active streams.
    pub stream_id: String,
    /// Sign encodes direction, magnitude the rate multiplier; `0` is a
    /// single-frame step request.
    pub speed: Option<f64>,
    /// Encoded media kind (container/codec tag or image tag).
    pub format: Option<String>,
    /// Stream source identifier (camera/channel path).
    pub endpoint: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Per-source descriptors for multiplexed multi-camera frames.
    pub entities: Vec<Entity>,
    pub key_frames: bool,
    /// Archive start position as a compact timestamp.
    pub begin_time: Option<String>,
}

/// A command that tears one or more streams down.
#[derive(Debug, Clone, PartialEq)]
pub struct StopCommand {
    pub method: String,
    pub stream_id: String,
}

/// Anything on the channel that is not a start or stop command.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub method: Option<String>,
    pub payload: Value,
}

/// Per-source descriptor inside a synchronized multi-camera command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub archive: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Playback direction derived from the sign of a speed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackDirection {
    Forward,
    Reverse,
    /// A `speed: 0` single-frame step request.
    Step,
}

/// Raw wire shape; every field optional so classification can inspect what
/// is actually present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFrame {
    #[serde(default)]
    method: Option<String>,
    #[serde(default, alias = "session_id")]
    stream_id: Option<String>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default, deserialize_with = "boolish")]
    key_frames: bool,
    #[serde(default)]
    begin_time: Option<String>,
}

/// The wire renders `keyFrames` inconsistently: bool, 0/1 or a string.
fn boolish<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => flag,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

impl Frame {
    /// Decode one raw channel payload.
    ///
    /// # Errors
    ///
    /// Returns a `Parse` error when the payload is not valid JSON or a
    /// recognized field has an incompatible type.
    pub fn decode(payload: &str) -> Result<Frame> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| VerifyError::parse_error("frame decode", e.to_string()))?;
        let wire: WireFrame = serde_json::from_value(value.clone())
            .map_err(|e| VerifyError::parse_error("frame decode", e.to_string()))?;

        let is_stop = wire.method.as_deref().is_some_and(|m| m.contains(STOP_MARKER));
        match wire.stream_id {
            Some(stream_id) if is_stop => Ok(Frame::Stop(StopCommand {
                method: wire.method.unwrap_or_default(),
                stream_id,
            })),
            Some(stream_id) => Ok(Frame::Start(StartCommand {
                method: wire.method.unwrap_or_default(),
                stream_id,
                speed: wire.speed,
                format: wire.format,
                endpoint: wire.endpoint,
                width: wire.width,
                height: wire.height,
                entities: wire.entities,
                key_frames: wire.key_frames,
                begin_time: wire.begin_time,
            })),
            None => Ok(Frame::Telemetry(Telemetry { method: wire.method, payload: value })),
        }
    }

    /// Stream id carried by this frame, if any.
    pub fn stream_id(&self) -> Option<&str> {
        match self {
            Frame::Start(start) => Some(&start.stream_id),
            Frame::Stop(stop) => Some(&stop.stream_id),
            Frame::Telemetry(_) => None,
        }
    }

    /// Method discriminator, if present on the wire.
    pub fn method(&self) -> Option<&str> {
        match self {
            Frame::Start(start) => Some(&start.method),
            Frame::Stop(stop) => Some(&stop.method),
            Frame::Telemetry(telemetry) => telemetry.method.as_deref(),
        }
    }
}

impl StartCommand {
    /// Direction encoded by the sign of the speed field.
    pub fn direction(&self) -> Option<PlaybackDirection> {
        self.speed.map(|speed| {
            if speed == 0.0 {
                PlaybackDirection::Step
            } else if speed < 0.0 {
                PlaybackDirection::Reverse
            } else {
                PlaybackDirection::Forward
            }
        })
    }

    /// Rate multiplier regardless of direction.
    pub fn rate(&self) -> Option<f64> {
        self.speed.map(f64::abs)
    }
}

impl StopCommand {
    /// Whether this stop tears `stream_id` down.
    ///
    /// A synchronized multi-entity stop id textually contains the ids of
    /// the child streams it subsumes, its own included.
    pub fn subsumes(&self, stream_id: &str) -> bool {
        self.stream_id.contains(stream_id)
    }
}
