//! One recording session, from device acquisition to download.

use std::path::PathBuf;
use std::sync::Arc;

use camlayer_capture_engine::{
    AudioChunk, CapturePipeline, CaptureState, CombinedStream, FinalizedAsset, GainControl,
    GainedAudio, MediaSource, Recorder, StreamMetadata,
};
use camlayer_common::clock::RecordingClock;
use camlayer_common::config::AppConfig;
use camlayer_common::error::{CamlayerError, CamlayerResult};
use camlayer_compositor::{RenderLoop, Surface, SurfaceStream};
use camlayer_interaction::{DragController, PointerEvent};
use camlayer_layout_model::{LayoutHandle, Rect};
use tokio::sync::broadcast;

use crate::decode::ImageDecoder;
use crate::sinks::{DownloadSink, PlaybackSink};

/// What the main view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// The live composited surface.
    Live,
    /// The finalized recording.
    Playback,
}

/// Which user controls are currently actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlsState {
    pub start: bool,
    pub stop: bool,
    pub play: bool,
    pub download: bool,
}

impl ControlsState {
    pub fn derive(state: CaptureState, has_asset: bool) -> Self {
        let idle = state == CaptureState::Idle;
        Self {
            start: idle,
            stop: state == CaptureState::Recording,
            play: idle && has_asset,
            download: idle && has_asset,
        }
    }
}

/// A running session: live compositing plus on-demand recording.
pub struct Session {
    config: AppConfig,
    metadata: StreamMetadata,
    layout: LayoutHandle,
    drag: DragController,
    render: RenderLoop,
    capture: CapturePipeline,
    audio: GainedAudio,
    decoder: Arc<dyn ImageDecoder>,
    view: ViewMode,
    clock: RecordingClock,
    // Keeps the microphone channel open while no recording subscribes.
    _mic: broadcast::Sender<AudioChunk>,
}

impl Session {
    /// Acquire devices, wait for stream metadata, wire the gain graph and
    /// start the render loop.
    ///
    /// Acquisition failure is fatal and not retried.
    pub async fn initialize(
        config: AppConfig,
        source: &mut dyn MediaSource,
        recorder: Box<dyn Recorder>,
        decoder: Arc<dyn ImageDecoder>,
    ) -> CamlayerResult<Self> {
        config.validate()?;
        let source_name = source.name().to_string();
        tracing::info!(source = %source_name, recorder = recorder.name(), "Initializing session");

        let mut live = source.acquire().await.map_err(|e| {
            tracing::error!(source = %source_name, error = %e, "Error accessing media devices");
            match e {
                CamlayerError::Acquisition { .. } => e,
                other => CamlayerError::acquisition(other.to_string()),
            }
        })?;
        let metadata = live.metadata().await.map_err(|e| {
            tracing::error!(error = %e, "Media stream never became ready");
            e
        })?;
        tracing::info!(
            width = metadata.width,
            height = metadata.height,
            sample_rate = metadata.sample_rate,
            channels = metadata.channels,
            "Media stream ready"
        );

        let gain = GainControl::new(config.recording.gain)?;
        let audio = GainedAudio::connect(live.audio.subscribe(), gain.clone());

        let clock = RecordingClock::start();
        tracing::debug!(started_at = clock.epoch_wall(), "Session clock started");
        let layout = LayoutHandle::new();
        let render = RenderLoop::spawn(
            Surface::new(config.surface.width, config.surface.height),
            live.video.clone(),
            layout.clone(),
            config.recording.fps,
            clock.clone(),
        );

        Ok(Self {
            drag: DragController::new(layout.clone()),
            capture: CapturePipeline::new(recorder, gain, config.recording.mime_type.clone()),
            metadata,
            layout,
            render,
            audio,
            decoder,
            view: ViewMode::Live,
            clock,
            _mic: live.audio,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metadata(&self) -> StreamMetadata {
        self.metadata
    }

    /// Shared handle to the overlay layout.
    pub fn layout(&self) -> &LayoutHandle {
        &self.layout
    }

    /// The composited output, as recorded.
    pub fn capture_stream(&self) -> SurfaceStream {
        self.render.capture_stream()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn controls(&self) -> ControlsState {
        ControlsState::derive(self.capture.state(), self.capture.finalized_asset().is_some())
    }

    pub fn finalized_asset(&self) -> Option<FinalizedAsset> {
        self.capture.finalized_asset()
    }

    /// Seconds since the session started.
    pub fn uptime_secs(&self) -> f64 {
        self.clock.elapsed_secs()
    }

    /// Start recording, then clear all overlays and return to the live view.
    /// Returns `Ok(false)` if a recording is already in progress. If the
    /// recorder refuses to start, the overlays and view are left as they were.
    pub fn start_recording(&mut self) -> CamlayerResult<bool> {
        if self.capture.state() != CaptureState::Idle {
            tracing::debug!("Start ignored: recording already in progress");
            return Ok(false);
        }

        let stream = CombinedStream::new(
            self.render.capture_stream(),
            self.audio.subscribe(),
            self.config.recording.fps,
            self.metadata.sample_rate,
            self.metadata.channels,
        );
        if !self.capture.start(stream)? {
            return Ok(false);
        }

        let removed = self.layout.clear();
        tracing::debug!(removed, "Overlays cleared for new recording");
        self.view = ViewMode::Live;
        Ok(true)
    }

    /// Request the recording stop. The asset appears once the recorder
    /// reports it has stopped; see [`Session::wait_for_recording`].
    pub fn stop_recording(&mut self) -> CamlayerResult<bool> {
        self.capture.stop()
    }

    /// Wait for any pending stop and return the finalized asset.
    pub async fn wait_for_recording(&self) -> CamlayerResult<Option<FinalizedAsset>> {
        self.capture.wait_until_idle().await?;
        Ok(self.capture.finalized_asset())
    }

    /// Decode an uploaded image and append it to the layout.
    ///
    /// Undecodable input is logged and dropped; the layout is unchanged.
    pub async fn add_image(&self, bytes: Vec<u8>) -> Option<(usize, Rect)> {
        let size = bytes.len();
        match self.decoder.decode(bytes).await {
            Ok(image) => Some(self.layout.add(
                image,
                self.config.surface.width as f64,
                self.config.surface.height as f64,
                &self.config.layout,
            )),
            Err(e) => {
                tracing::warn!(bytes = size, error = %e, "Image could not be decoded; ignoring");
                None
            }
        }
    }

    /// Forward a pointer event, in surface coordinates, to the drag
    /// controller. Returns `true` if an overlay moved.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        self.drag.handle(event)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn set_gain(&self, value: f32) -> CamlayerResult<f32> {
        self.capture.set_gain(value)
    }

    pub fn gain(&self) -> f32 {
        self.capture.gain()
    }

    /// Switch to playback and hand the recording to `sink`.
    /// Returns `Ok(false)` when there is nothing to play.
    pub fn play(&mut self, sink: &mut dyn PlaybackSink) -> CamlayerResult<bool> {
        let Some(asset) = self.playable_asset() else {
            tracing::debug!("Play ignored: no finalized recording");
            return Ok(false);
        };
        self.view = ViewMode::Playback;
        sink.play(&asset).map_err(|e| {
            tracing::error!(error = %e, "Playback failed");
            match e {
                CamlayerError::Playback { .. } => e,
                other => CamlayerError::playback(other.to_string()),
            }
        })?;
        Ok(true)
    }

    /// Hand the recording to `sink` under the configured file name.
    /// Returns `Ok(None)` when there is nothing to download.
    pub fn download(&self, sink: &dyn DownloadSink) -> CamlayerResult<Option<PathBuf>> {
        let Some(asset) = self.playable_asset() else {
            tracing::debug!("Download ignored: no finalized recording");
            return Ok(None);
        };
        sink.save(&asset, &self.config.recording.download_filename)
            .map(Some)
    }

    /// Stop any recording in progress, then stop the render loop.
    /// Returns the number of frames rendered.
    pub async fn shutdown(mut self) -> CamlayerResult<u64> {
        if self.capture.stop()? {
            self.capture.wait_until_idle().await?;
        }
        let frames = self.render.join().await?;
        tracing::info!(frames, uptime_secs = self.clock.elapsed_secs(), "Session shut down");
        Ok(frames)
    }

    fn playable_asset(&self) -> Option<FinalizedAsset> {
        if self.capture.state() != CaptureState::Idle {
            return None;
        }
        self.capture.finalized_asset()
    }
}
