//! Camlayer Session
//!
//! Wires the pieces of a recording session together:
//!
//! 1. acquire the camera and microphone (fatal on failure),
//! 2. wait for the stream metadata,
//! 3. connect the microphone through the gain stage,
//! 4. start the render loop,
//!
//! and then serves user operations: adding overlays, dragging them,
//! recording, playback and download.

pub mod decode;
pub mod session;
pub mod sinks;

pub use decode::{ImageDecoder, RasterDecoder};
pub use session::{ControlsState, Session, ViewMode};
pub use sinks::{DirectoryDownload, DownloadSink, PlaybackSink};
