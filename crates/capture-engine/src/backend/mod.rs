//! Camera and microphone acquisition.

use camlayer_common::error::{CamlayerError, CamlayerResult};
use camlayer_compositor::VideoFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot, watch};

use crate::audio::AudioChunk;

pub mod synthetic;
#[cfg(feature = "gstreamer")]
pub mod gst;

pub use synthetic::SyntheticSource;
#[cfg(feature = "gstreamer")]
pub use gst::{GstMediaSource, GstRecorder};

/// Negotiated properties of an acquired stream, known once the first
/// frame has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A live camera + microphone stream.
#[derive(Debug)]
pub struct LiveStream {
    /// Newest camera frame. `None` until the camera delivers.
    pub video: watch::Receiver<Option<VideoFrame>>,
    /// Raw microphone chunks.
    pub audio: broadcast::Sender<AudioChunk>,
    ready: Option<oneshot::Receiver<StreamMetadata>>,
}

impl LiveStream {
    pub fn new(
        video: watch::Receiver<Option<VideoFrame>>,
        audio: broadcast::Sender<AudioChunk>,
        ready: oneshot::Receiver<StreamMetadata>,
    ) -> Self {
        Self {
            video,
            audio,
            ready: Some(ready),
        }
    }

    /// Wait until the stream reports its metadata.
    pub async fn metadata(&mut self) -> CamlayerResult<StreamMetadata> {
        let ready = self
            .ready
            .take()
            .ok_or_else(|| CamlayerError::acquisition("Stream metadata already consumed"))?;
        ready
            .await
            .map_err(|_| CamlayerError::acquisition("Media source ended before reporting metadata"))
    }
}

/// Something that can open the camera and microphone.
///
/// Acquisition failure (device missing, permission denied) is reported
/// as [`CamlayerError::Acquisition`] and is not retried.
#[async_trait::async_trait]
pub trait MediaSource: Send {
    async fn acquire(&mut self) -> CamlayerResult<LiveStream>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
