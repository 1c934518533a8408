//! Camlayer Capture Engine
//!
//! Acquires the camera and microphone, adjusts microphone gain, and
//! records the compositor's output into a single WebM asset.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   frames    ┌────────────┐  SurfaceStream  ┌─────────────────┐
//! │ MediaSource  │────────────▶│ Compositor │────────────────▶│                 │
//! │ (camera+mic) │             └────────────┘                 │ CapturePipeline │
//! │              │   chunks    ┌────────────┐  gained audio   │   └ Recorder    │
//! │              │────────────▶│ GainedAudio│────────────────▶│                 │
//! └──────────────┘             └────────────┘                 └────────┬────────┘
//!                                                                      │ fragments
//!                                                                      ▼
//!                                                               FinalizedAsset
//! ```
//!
//! The GStreamer adapters are behind the `gstreamer` feature; the
//! synthetic source needs no devices.

pub mod audio;
pub mod backend;
pub mod pipeline;
pub mod recorder;
pub mod stream;

pub use audio::{AudioChunk, GainControl, GainedAudio};
pub use backend::{LiveStream, MediaSource, StreamMetadata, SyntheticSource};
pub use pipeline::{CapturePipeline, CaptureState, FinalizedAsset, RecordingBuffer};
pub use recorder::{Recorder, RecorderEvent, RecorderState};
pub use stream::{CombinedStream, StreamFormat};

/// Whether the GStreamer adapters were compiled in.
pub const GSTREAMER_ENABLED: bool = cfg!(feature = "gstreamer");
