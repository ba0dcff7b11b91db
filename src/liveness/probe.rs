//! Observable playback proxies.

use async_trait::async_trait;

use crate::Result;

/// One video cell's observable playback state.
///
/// Implemented by the UI-automation glue; the engine only consumes it.
/// Every method is a suspension point: readouts and captures go through
/// the browser, and the playing indicator resolves whenever the cell
/// attaches it.
#[async_trait]
pub trait CellProbe: Send + Sync {
    /// Identifier used in failure messages (cell index, camera name).
    fn label(&self) -> String;

    /// Current displayed clock readout (`hh:mm:ss`).
    async fn timer_text(&self) -> Result<String>;

    /// Capture the cell's rendered surface as raw bytes.
    async fn capture_frame(&self) -> Result<Vec<u8>>;

    /// Resolves once the cell shows its "now playing" indicator.
    async fn wait_until_playing(&self) -> Result<()>;
}
