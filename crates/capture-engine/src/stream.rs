//! The combined stream handed to a recorder.

use camlayer_compositor::SurfaceStream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::audio::AudioChunk;

/// Format of the combined stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Composited video plus gain-adjusted microphone audio.
///
/// The video track is the compositor surface's capture stream, never the
/// raw camera frames.
#[derive(Debug)]
pub struct CombinedStream {
    pub video: SurfaceStream,
    pub audio: broadcast::Receiver<AudioChunk>,
    pub format: StreamFormat,
}

impl CombinedStream {
    pub fn new(
        video: SurfaceStream,
        audio: broadcast::Receiver<AudioChunk>,
        fps: u32,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        let format = StreamFormat {
            width: video.width(),
            height: video.height(),
            fps,
            sample_rate,
            channels,
        };
        Self {
            video,
            audio,
            format,
        }
    }
}
