//! GStreamer adapters: camera/microphone acquisition and WebM encoding.
//!
//! Acquisition runs `autovideosrc`/`autoaudiosrc` into appsinks that are
//! drained on blocking threads. Recording feeds the compositor's capture
//! stream and the gained microphone audio into appsrcs, encodes VP8 and
//! Opus into a streamable WebM, and hands every muxer output buffer to
//! the pipeline as one fragment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use camlayer_common::clock::RecordingClock;
use camlayer_common::error::{CamlayerError, CamlayerResult};
use camlayer_compositor::VideoFrame;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::RgbaImage;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::{LiveStream, MediaSource, StreamMetadata};
use crate::audio::{AudioChunk, AUDIO_CHANNEL_CAPACITY};
use crate::recorder::{Recorder, RecorderEvent, RecorderState};
use crate::stream::{CombinedStream, StreamFormat};

const PULL_TIMEOUT_MS: u64 = 100;
const STATE_CHANGE_TIMEOUT_SECS: u64 = 10;

fn init_gstreamer() -> CamlayerResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(CamlayerError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn launch_pipeline(launch: &str) -> CamlayerResult<gst::Pipeline> {
    tracing::debug!(pipeline = %launch, "Building GStreamer pipeline");
    gst::parse::launch(launch)
        .map_err(|e| CamlayerError::capture(format!("Failed to build pipeline: {e}")))?
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| CamlayerError::capture("Launch string did not produce a pipeline"))
}

fn element<T: IsA<gst::Element>>(pipeline: &gst::Pipeline, name: &str) -> CamlayerResult<T> {
    pipeline
        .by_name(name)
        .ok_or_else(|| CamlayerError::capture(format!("Pipeline has no element named {name}")))?
        .dynamic_cast::<T>()
        .map_err(|_| CamlayerError::capture(format!("Element {name} has an unexpected type")))
}

fn play(pipeline: &gst::Pipeline, what: &str) -> CamlayerResult<()> {
    pipeline
        .set_state(gst::State::Playing)
        .map_err(|e| CamlayerError::capture(format!("Failed to start {what} pipeline: {e:?}")))?;
    match pipeline.state(gst::ClockTime::from_seconds(STATE_CHANGE_TIMEOUT_SECS)) {
        (Ok(_), gst::State::Playing, _) => Ok(()),
        (Ok(_), state, _) => {
            tracing::warn!(pipeline = what, ?state, "Pipeline did not reach Playing state within timeout");
            Ok(())
        }
        (Err(e), _, _) => Err(CamlayerError::capture(format!(
            "{what} pipeline failed to reach Playing state: {e:?}"
        ))),
    }
}

fn shut_down(pipeline: &gst::Pipeline, what: &str) {
    if let Err(e) = pipeline.set_state(gst::State::Null) {
        tracing::warn!(pipeline = what, error = ?e, "Failed to set pipeline to Null");
    }
}

/// Camera and microphone via the platform's default devices.
#[derive(Debug, Clone)]
pub struct GstMediaSource {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl GstMediaSource {
    pub fn new(width: u32, height: u32, fps: u32, sample_rate: u32, channels: u16) -> Self {
        Self {
            width,
            height,
            fps,
            sample_rate,
            channels,
        }
    }

    fn launch_string(&self) -> String {
        format!(
            "autovideosrc ! videoconvert ! videoscale ! videorate ! \
             video/x-raw,format=RGBA,width={w},height={h},framerate={fps}/1 ! \
             appsink name=camera max-buffers=2 drop=true sync=false \
             autoaudiosrc ! audioconvert ! audioresample ! \
             audio/x-raw,format=F32LE,layout=interleaved,rate={rate},channels={ch} ! \
             appsink name=mic sync=false",
            w = self.width,
            h = self.height,
            fps = self.fps.max(1),
            rate = self.sample_rate,
            ch = self.channels.max(1),
        )
    }
}

#[async_trait::async_trait]
impl MediaSource for GstMediaSource {
    async fn acquire(&mut self) -> CamlayerResult<LiveStream> {
        let acquisition = |e: CamlayerError| CamlayerError::acquisition(e.to_string());

        init_gstreamer().map_err(acquisition)?;
        let pipeline = launch_pipeline(&self.launch_string()).map_err(acquisition)?;
        let camera: gst_app::AppSink = element(&pipeline, "camera").map_err(acquisition)?;
        let mic: gst_app::AppSink = element(&pipeline, "mic").map_err(acquisition)?;
        play(&pipeline, "acquisition").map_err(|e| {
            shut_down(&pipeline, "acquisition");
            acquisition(e)
        })?;

        let (video_tx, video_rx) = watch::channel(None);
        let (audio_tx, _audio_rx) = broadcast::channel(AUDIO_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let running = Arc::new(AtomicBool::new(true));
        let clock = RecordingClock::start();

        {
            let running = Arc::clone(&running);
            let clock = clock.clone();
            let (sample_rate, channels) = (self.sample_rate, self.channels);
            tokio::task::spawn_blocking(move || {
                drain_camera(camera, video_tx, ready_tx, sample_rate, channels, clock);
                running.store(false, Ordering::SeqCst);
                shut_down(&pipeline, "acquisition");
            });
        }
        {
            let audio = audio_tx.clone();
            tokio::task::spawn_blocking(move || drain_mic(mic, audio, running, clock));
        }

        tracing::info!(width = self.width, height = self.height, fps = self.fps, "Camera and microphone acquired");
        Ok(LiveStream::new(video_rx, audio_tx, ready_rx))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

fn drain_camera(
    camera: gst_app::AppSink,
    video: watch::Sender<Option<VideoFrame>>,
    ready: oneshot::Sender<StreamMetadata>,
    sample_rate: u32,
    channels: u16,
    clock: RecordingClock,
) {
    let mut ready = Some(ready);
    while !video.is_closed() {
        let Some(sample) = camera.try_pull_sample(gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS))
        else {
            if camera.is_eos() {
                tracing::warn!("Camera stream ended");
                break;
            }
            continue;
        };
        let Some(image) = sample_to_rgba(&sample) else {
            tracing::warn!("Dropping camera sample with unexpected layout");
            continue;
        };
        if let Some(tx) = ready.take() {
            let _ = tx.send(StreamMetadata {
                width: image.width(),
                height: image.height(),
                sample_rate,
                channels,
            });
        }
        video.send_replace(Some(VideoFrame::new(image, clock.elapsed_ns())));
    }
}

fn sample_to_rgba(sample: &gst::Sample) -> Option<RgbaImage> {
    let caps = sample.caps()?;
    let structure = caps.structure(0)?;
    let width = u32::try_from(structure.get::<i32>("width").ok()?).ok()?;
    let height = u32::try_from(structure.get::<i32>("height").ok()?).ok()?;
    let buffer = sample.buffer()?;
    let map = buffer.map_readable().ok()?;
    RgbaImage::from_raw(width, height, map.as_slice().to_vec())
}

fn drain_mic(
    mic: gst_app::AppSink,
    audio: broadcast::Sender<AudioChunk>,
    running: Arc<AtomicBool>,
    clock: RecordingClock,
) {
    while running.load(Ordering::SeqCst) {
        let Some(sample) = mic.try_pull_sample(gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS)) else {
            if mic.is_eos() {
                break;
            }
            continue;
        };
        let Some(chunk) = sample_to_chunk(&sample, clock.elapsed_ns()) else {
            continue;
        };
        let _ = audio.send(chunk);
    }
}

fn sample_to_chunk(sample: &gst::Sample, timestamp_ns: u64) -> Option<AudioChunk> {
    let caps = sample.caps()?;
    let structure = caps.structure(0)?;
    let sample_rate = u32::try_from(structure.get::<i32>("rate").ok()?).ok()?;
    let channels = u16::try_from(structure.get::<i32>("channels").ok()?).ok()?;
    let buffer = sample.buffer()?;
    let map = buffer.map_readable().ok()?;
    let samples = map
        .as_slice()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Some(AudioChunk {
        samples,
        sample_rate,
        channels,
        timestamp_ns,
    })
}

/// VP8 + Opus in a streamable WebM container.
#[derive(Debug, Default)]
pub struct GstRecorder {
    active: Arc<AtomicBool>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl GstRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn launch_string(format: &StreamFormat) -> String {
        // Two seconds between keyframes keeps the file seekable.
        let keyint = format.fps.saturating_mul(2).max(2);
        format!(
            "appsrc name=video is-live=true format=time do-timestamp=true \
             caps=video/x-raw,format=RGBA,width={w},height={h},framerate={fps}/1 ! \
             queue ! videoconvert ! vp8enc deadline=1 keyframe-max-dist={keyint} ! queue ! \
             webmmux name=mux streamable=true ! appsink name=out sync=false \
             appsrc name=audio is-live=true format=time do-timestamp=true \
             caps=audio/x-raw,format=F32LE,layout=interleaved,rate={rate},channels={ch} ! \
             queue ! audioconvert ! audioresample ! opusenc ! queue ! mux.",
            w = format.width,
            h = format.height,
            fps = format.fps.max(1),
            rate = format.sample_rate,
            ch = format.channels.max(1),
        )
    }
}

impl Recorder for GstRecorder {
    fn start(
        &mut self,
        stream: CombinedStream,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> CamlayerResult<()> {
        init_gstreamer()?;
        let pipeline = launch_pipeline(&Self::launch_string(&stream.format))
            .map_err(|e| CamlayerError::recorder(e.to_string()))?;
        let video_src: gst_app::AppSrc = element(&pipeline, "video")?;
        let audio_src: gst_app::AppSrc = element(&pipeline, "audio")?;
        let out: gst_app::AppSink = element(&pipeline, "out")?;

        let fragments = events.clone();
        out.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    let _ = fragments.send(RecorderEvent::DataAvailable(map.as_slice().to_vec()));
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        play(&pipeline, "recorder").map_err(|e| {
            shut_down(&pipeline, "recorder");
            CamlayerError::recorder(e.to_string())
        })?;

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(feed_video(stream.video, video_src, stop_rx.clone()));
        tokio::spawn(feed_audio(stream.audio, audio_src, stop_rx));

        let active = Arc::clone(&self.active);
        active.store(true, Ordering::SeqCst);
        std::thread::spawn(move || {
            wait_for_eos(&pipeline);
            shut_down(&pipeline, "recorder");
            active.store(false, Ordering::SeqCst);
            let _ = events.send(RecorderEvent::Stopped);
        });

        self.stop_tx = Some(stop_tx);
        Ok(())
    }

    fn stop(&mut self) -> CamlayerResult<()> {
        let stop_tx = self
            .stop_tx
            .take()
            .ok_or_else(|| CamlayerError::recorder("Recorder was not started"))?;
        stop_tx
            .send(true)
            .map_err(|_| CamlayerError::recorder("Recorder feed tasks already exited"))
    }

    fn state(&self) -> RecorderState {
        if self.active.load(Ordering::SeqCst) {
            RecorderState::Recording
        } else {
            RecorderState::Inactive
        }
    }

    fn name(&self) -> &str {
        "gstreamer-webm"
    }
}

async fn feed_video(
    mut frames: camlayer_compositor::SurfaceStream,
    src: gst_app::AppSrc,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            frame = frames.next_frame() => {
                let Some(frame) = frame else { break };
                let buffer = gst::Buffer::from_mut_slice(frame.image.as_raw().clone());
                if let Err(e) = src.push_buffer(buffer) {
                    tracing::warn!(error = ?e, "Video appsrc refused buffer");
                    break;
                }
            }
        }
    }
    if let Err(e) = src.end_of_stream() {
        tracing::warn!(error = ?e, "Failed to send EOS on video appsrc");
    }
}

async fn feed_audio(
    mut chunks: broadcast::Receiver<AudioChunk>,
    src: gst_app::AppSrc,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            chunk = chunks.recv() => match chunk {
                Ok(chunk) => {
                    let buffer = gst::Buffer::from_mut_slice(chunk.to_le_bytes());
                    if let Err(e) = src.push_buffer(buffer) {
                        tracing::warn!(error = ?e, "Audio appsrc refused buffer");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Recorder fell behind on audio");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    if let Err(e) = src.end_of_stream() {
        tracing::warn!(error = ?e, "Failed to send EOS on audio appsrc");
    }
}

/// Block until the pipeline drains to EOS or reports an error.
fn wait_for_eos(pipeline: &gst::Pipeline) {
    let Some(bus) = pipeline.bus() else {
        tracing::warn!("Recorder pipeline has no bus");
        return;
    };
    loop {
        let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS)) else {
            continue;
        };
        match msg.view() {
            gst::MessageView::Eos(_) => {
                tracing::debug!("Recorder pipeline drained");
                return;
            }
            gst::MessageView::Error(e) => {
                tracing::warn!(error = %e.error(), debug = ?e.debug(), "Recorder pipeline error");
                return;
            }
            _ => {}
        }
    }
}
