//! The recording pipeline: recorder lifecycle and fragment buffering.
//!
//! ```text
//!          start()               stop()              Stopped
//!   Idle ──────────▶ Recording ─────────▶ Stopping ───────────▶ Idle
//!    ▲                                                           │
//!    └──────────────────── finalized asset available ◀───────────┘
//! ```
//!
//! Fragments are appended in notification order by a single consumer
//! task, and the finalized asset is built exactly once per stop. Only the
//! consumer finalizes: when the recorder cannot deliver its own `Stopped`,
//! the pipeline queues one behind any fragments still in the channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camlayer_common::error::{CamlayerError, CamlayerResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, WeakUnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audio::GainControl;
use crate::recorder::{Recorder, RecorderEvent, RecorderState};
use crate::stream::CombinedStream;

/// State of the capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Recording,
    /// Stop requested; waiting for the recorder's stop notification.
    Stopping,
}

/// A complete recording, ready for playback or download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedAsset {
    bytes: Arc<[u8]>,
    mime_type: String,
    fragment_count: usize,
}

impl FinalizedAsset {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>, fragment_count: usize) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            fragment_count,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Number of fragments that were concatenated.
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Chunk accumulation for one recording.
///
/// Pure state: no I/O, no locking. [`CapturePipeline`] drives it.
#[derive(Debug)]
pub struct RecordingBuffer {
    state: CaptureState,
    chunks: Vec<Vec<u8>>,
    finalized: Option<FinalizedAsset>,
    mime_type: String,
}

impl RecordingBuffer {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            state: CaptureState::Idle,
            chunks: Vec::new(),
            finalized: None,
            mime_type: mime_type.into(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn finalized(&self) -> Option<&FinalizedAsset> {
        self.finalized.as_ref()
    }

    /// Enter `Recording`, discarding leftover chunks and the previous asset.
    /// Only valid from `Idle`.
    pub fn begin(&mut self) -> bool {
        if self.state != CaptureState::Idle {
            return false;
        }
        self.chunks.clear();
        self.finalized = None;
        self.state = CaptureState::Recording;
        true
    }

    /// Back out of a start that the recorder refused.
    pub fn abort(&mut self) {
        self.chunks.clear();
        self.state = CaptureState::Idle;
    }

    /// Move to `Stopping`. Only valid from `Recording`.
    pub fn request_stop(&mut self) -> bool {
        if self.state != CaptureState::Recording {
            return false;
        }
        self.state = CaptureState::Stopping;
        true
    }

    /// Append a fragment. Empty fragments and fragments arriving while idle
    /// are ignored.
    pub fn push_fragment(&mut self, fragment: Vec<u8>) -> bool {
        if fragment.is_empty() || self.state == CaptureState::Idle {
            return false;
        }
        self.chunks.push(fragment);
        true
    }

    /// Concatenate all fragments into the finalized asset and return to
    /// `Idle`. Does nothing when already idle.
    pub fn finish(&mut self) -> Option<&FinalizedAsset> {
        if self.state == CaptureState::Idle {
            return None;
        }
        let fragment_count = self.chunks.len();
        let bytes: Vec<u8> = self.chunks.drain(..).flatten().collect();
        self.finalized = Some(FinalizedAsset::new(bytes, self.mime_type.clone(), fragment_count));
        self.state = CaptureState::Idle;
        self.finalized.as_ref()
    }

    pub fn clear_finalized(&mut self) -> Option<FinalizedAsset> {
        self.finalized.take()
    }
}

#[derive(Debug)]
struct Shared {
    buffer: Mutex<RecordingBuffer>,
    state_tx: watch::Sender<CaptureState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RecordingBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: CaptureState) {
        self.state_tx.send_replace(state);
    }

    fn push(&self, fragment: Vec<u8>) {
        let size = fragment.len();
        if self.lock().push_fragment(fragment) {
            tracing::trace!(size, "Recording fragment buffered");
        }
    }

    fn finish(&self) {
        let mut buffer = self.lock();
        if let Some(asset) = buffer.finish() {
            tracing::info!(
                bytes = asset.len(),
                fragments = asset.fragment_count(),
                "Recording finalized"
            );
        }
        let state = buffer.state();
        drop(buffer);
        self.publish(state);
    }
}

/// Owns a [`Recorder`] and turns its notifications into a finalized asset.
pub struct CapturePipeline {
    shared: Arc<Shared>,
    recorder: Box<dyn Recorder>,
    gain: GainControl,
    events: Option<JoinHandle<()>>,
    // Weak so a recorder dropping its sender still closes the channel.
    notify: Option<WeakUnboundedSender<RecorderEvent>>,
}

impl CapturePipeline {
    /// `mime_type` labels every finalized asset.
    pub fn new(recorder: Box<dyn Recorder>, gain: GainControl, mime_type: impl Into<String>) -> Self {
        let (state_tx, _rx) = watch::channel(CaptureState::Idle);
        Self {
            shared: Arc::new(Shared {
                buffer: Mutex::new(RecordingBuffer::new(mime_type)),
                state_tx,
            }),
            recorder,
            gain,
            events: None,
            notify: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.shared.lock().state()
    }

    pub fn recorder_name(&self) -> &str {
        self.recorder.name()
    }

    /// Start recording `stream`. Returns `Ok(false)` when not idle.
    pub fn start(&mut self, stream: CombinedStream) -> CamlayerResult<bool> {
        if !self.shared.lock().begin() {
            tracing::debug!(state = ?self.state(), "Ignoring start: capture not idle");
            return Ok(false);
        }
        self.shared.publish(CaptureState::Recording);

        let format = stream.format;
        let (tx, rx) = mpsc::unbounded_channel();
        let notify = tx.downgrade();
        if let Err(e) = self.recorder.start(stream, tx) {
            tracing::error!(recorder = self.recorder.name(), error = %e, "Recorder failed to start");
            self.shared.lock().abort();
            self.shared.publish(CaptureState::Idle);
            return Err(e);
        }

        if let Some(previous) = self.events.take() {
            previous.abort();
        }
        self.events = Some(spawn_event_consumer(Arc::clone(&self.shared), rx));
        self.notify = Some(notify);

        tracing::info!(
            recorder = self.recorder.name(),
            width = format.width,
            height = format.height,
            fps = format.fps,
            "Recording started"
        );
        Ok(true)
    }

    /// Request a stop. Returns `Ok(false)` when not recording.
    ///
    /// The pipeline stays in `Stopping` until every fragment already sent
    /// has been buffered; see [`CapturePipeline::wait_until_idle`].
    pub fn stop(&mut self) -> CamlayerResult<bool> {
        if !self.shared.lock().request_stop() {
            tracing::debug!(state = ?self.state(), "Ignoring stop: not recording");
            return Ok(false);
        }
        self.shared.publish(CaptureState::Stopping);

        if self.recorder.state() == RecorderState::Inactive {
            tracing::debug!("Recorder already inactive; finalizing after queued fragments");
            self.queue_stop();
            return Ok(true);
        }

        if let Err(e) = self.recorder.stop() {
            tracing::error!(recorder = self.recorder.name(), error = %e, "Recorder failed to stop");
            self.queue_stop();
            return Err(e);
        }
        Ok(true)
    }

    /// Wait until the pipeline is idle again.
    pub async fn wait_until_idle(&self) -> CamlayerResult<()> {
        let mut rx = self.shared.state_tx.subscribe();
        rx.wait_for(|state| *state == CaptureState::Idle)
            .await
            .map(|_| ())
            .map_err(|_| CamlayerError::capture("Capture state channel closed"))
    }

    /// The last finalized recording, if any.
    pub fn finalized_asset(&self) -> Option<FinalizedAsset> {
        self.shared.lock().finalized().cloned()
    }

    pub fn clear_finalized_asset(&self) -> Option<FinalizedAsset> {
        self.shared.lock().clear_finalized()
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_gain(&self, value: f32) -> CamlayerResult<f32> {
        let applied = self.gain.set(value)?;
        tracing::debug!(gain = applied, "Microphone gain changed");
        Ok(applied)
    }

    /// Queue a `Stopped` behind whatever the recorder already sent.
    fn queue_stop(&mut self) {
        let Some(tx) = self.notify.take().and_then(|weak| weak.upgrade()) else {
            // Every sender is gone: the consumer drains the channel and
            // finalizes when it sees it closed.
            return;
        };
        if tx.send(RecorderEvent::Stopped).is_err() {
            // Consumer already exited; nothing is left in flight.
            self.shared.finish();
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        if let Some(task) = self.events.take() {
            task.abort();
        }
    }
}

fn spawn_event_consumer(
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<RecorderEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                RecorderEvent::DataAvailable(fragment) => shared.push(fragment),
                RecorderEvent::Stopped => {
                    shared.finish();
                    return;
                }
            }
        }
        // The recorder went away without a stop notification.
        tracing::warn!("Recorder event channel closed unexpectedly");
        shared.finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use camlayer_compositor::Surface;
    use tokio::sync::broadcast;

    /// Emits one scripted fragment per `start`, echoes `stop` as `Stopped`.
    struct ScriptedRecorder {
        state: RecorderState,
        events: Option<mpsc::UnboundedSender<RecorderEvent>>,
        fail_start: bool,
        fail_stop: bool,
        report_inactive: bool,
    }

    impl ScriptedRecorder {
        fn new() -> Self {
            Self {
                state: RecorderState::Inactive,
                events: None,
                fail_start: false,
                fail_stop: false,
                report_inactive: false,
            }
        }
    }

    impl Recorder for ScriptedRecorder {
        fn start(
            &mut self,
            _stream: CombinedStream,
            events: mpsc::UnboundedSender<RecorderEvent>,
        ) -> CamlayerResult<()> {
            if self.fail_start {
                return Err(CamlayerError::recorder("encoder unavailable"));
            }
            events.send(RecorderEvent::DataAvailable(b"head".to_vec())).unwrap();
            events.send(RecorderEvent::DataAvailable(Vec::new())).unwrap();
            events.send(RecorderEvent::DataAvailable(b"-body".to_vec())).unwrap();
            self.events = Some(events);
            self.state = RecorderState::Recording;
            Ok(())
        }

        fn stop(&mut self) -> CamlayerResult<()> {
            if self.fail_stop {
                return Err(CamlayerError::recorder("encoder wedged"));
            }
            if let Some(events) = self.events.take() {
                events.send(RecorderEvent::DataAvailable(b"-tail".to_vec())).unwrap();
                events.send(RecorderEvent::Stopped).unwrap();
            }
            self.state = RecorderState::Inactive;
            Ok(())
        }

        fn state(&self) -> RecorderState {
            if self.report_inactive {
                RecorderState::Inactive
            } else {
                self.state
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn pipeline_with(recorder: ScriptedRecorder) -> CapturePipeline {
        CapturePipeline::new(Box::new(recorder), GainControl::default(), "video/webm")
    }

    fn stream() -> CombinedStream {
        let surface = Surface::new(4, 4);
        let (_tx, rx) = broadcast::channel::<AudioChunk>(4);
        CombinedStream::new(surface.capture_stream(), rx, 30, 48_000, 1)
    }

    #[test]
    fn test_buffer_concatenates_in_order_and_skips_empty() {
        let mut buffer = RecordingBuffer::new("video/webm");
        assert!(buffer.begin());
        assert!(buffer.push_fragment(vec![1, 2]));
        assert!(!buffer.push_fragment(Vec::new()));
        assert!(buffer.push_fragment(vec![3]));
        assert!(buffer.request_stop());
        assert!(buffer.push_fragment(vec![4]));

        let asset = buffer.finish().cloned().unwrap();
        assert_eq!(asset.bytes(), &[1, 2, 3, 4]);
        assert_eq!(asset.fragment_count(), 3);
        assert_eq!(asset.mime_type(), "video/webm");
        assert_eq!(buffer.chunk_count(), 0);
        assert_eq!(buffer.state(), CaptureState::Idle);
    }

    #[test]
    fn test_buffer_rejects_invalid_transitions() {
        let mut buffer = RecordingBuffer::new("video/webm");
        assert!(!buffer.request_stop());
        assert!(buffer.finish().is_none());
        assert!(!buffer.push_fragment(vec![1]));

        assert!(buffer.begin());
        assert!(!buffer.begin());
        assert!(buffer.request_stop());
        assert!(!buffer.request_stop());
    }

    #[test]
    fn test_begin_discards_previous_asset() {
        let mut buffer = RecordingBuffer::new("video/webm");
        buffer.begin();
        buffer.push_fragment(vec![9]);
        buffer.finish();
        assert!(buffer.finalized().is_some());

        buffer.begin();
        assert!(buffer.finalized().is_none());
    }

    #[tokio::test]
    async fn test_start_stop_produces_one_asset() {
        let mut pipeline = pipeline_with(ScriptedRecorder::new());
        assert!(pipeline.start(stream()).unwrap());
        assert_eq!(pipeline.state(), CaptureState::Recording);

        assert!(pipeline.stop().unwrap());
        pipeline.wait_until_idle().await.unwrap();

        let asset = pipeline.finalized_asset().unwrap();
        assert_eq!(asset.bytes(), b"head-body-tail");
        assert_eq!(asset.fragment_count(), 3);
    }

    #[tokio::test]
    async fn test_redundant_start_and_stop_are_noops() {
        let mut pipeline = pipeline_with(ScriptedRecorder::new());
        assert!(!pipeline.stop().unwrap());

        assert!(pipeline.start(stream()).unwrap());
        assert!(!pipeline.start(stream()).unwrap());
        assert!(pipeline.stop().unwrap());
        assert!(!pipeline.stop().unwrap());
        pipeline.wait_until_idle().await.unwrap();
        assert!(!pipeline.stop().unwrap());

        assert_eq!(pipeline.finalized_asset().unwrap().bytes(), b"head-body-tail");
    }

    #[tokio::test]
    async fn test_recorder_start_failure_returns_to_idle() {
        let mut recorder = ScriptedRecorder::new();
        recorder.fail_start = true;
        let mut pipeline = pipeline_with(recorder);

        let err = pipeline.start(stream()).unwrap_err();
        assert!(matches!(err, CamlayerError::Recorder { .. }));
        assert_eq!(pipeline.state(), CaptureState::Idle);
        assert!(pipeline.finalized_asset().is_none());
    }

    #[tokio::test]
    async fn test_inactive_recorder_keeps_queued_fragments() {
        let mut recorder = ScriptedRecorder::new();
        recorder.report_inactive = true;
        let mut pipeline = pipeline_with(recorder);

        pipeline.start(stream()).unwrap();
        assert!(pipeline.stop().unwrap());
        pipeline.wait_until_idle().await.unwrap();

        let asset = pipeline.finalized_asset().unwrap();
        assert_eq!(asset.bytes(), b"head-body");
        assert_eq!(asset.fragment_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_queued_fragments() {
        let mut recorder = ScriptedRecorder::new();
        recorder.fail_stop = true;
        let mut pipeline = pipeline_with(recorder);

        pipeline.start(stream()).unwrap();
        let err = pipeline.stop().unwrap_err();
        assert!(matches!(err, CamlayerError::Recorder { .. }));
        pipeline.wait_until_idle().await.unwrap();

        assert_eq!(pipeline.finalized_asset().unwrap().bytes(), b"head-body");
        assert!(pipeline.start(stream()).unwrap());
    }

    #[tokio::test]
    async fn test_dropped_recorder_channel_finalizes() {
        struct Vanishing;

        impl Recorder for Vanishing {
            fn start(
                &mut self,
                _stream: CombinedStream,
                events: mpsc::UnboundedSender<RecorderEvent>,
            ) -> CamlayerResult<()> {
                events.send(RecorderEvent::DataAvailable(b"only".to_vec())).unwrap();
                Ok(())
            }

            fn stop(&mut self) -> CamlayerResult<()> {
                Ok(())
            }

            fn state(&self) -> RecorderState {
                RecorderState::Inactive
            }

            fn name(&self) -> &str {
                "vanishing"
            }
        }

        let mut pipeline = CapturePipeline::new(Box::new(Vanishing), GainControl::default(), "video/x-test");
        pipeline.start(stream()).unwrap();
        pipeline.stop().unwrap();
        pipeline.wait_until_idle().await.unwrap();

        let asset = pipeline.finalized_asset().unwrap();
        assert_eq!(asset.bytes(), b"only");
        assert_eq!(asset.mime_type(), "video/x-test");
    }

    #[tokio::test]
    async fn test_restart_discards_previous_asset() {
        let mut pipeline = pipeline_with(ScriptedRecorder::new());
        pipeline.start(stream()).unwrap();
        pipeline.stop().unwrap();
        pipeline.wait_until_idle().await.unwrap();
        assert!(pipeline.finalized_asset().is_some());

        pipeline.start(stream()).unwrap();
        assert!(pipeline.finalized_asset().is_none());
        assert!(pipeline.clear_finalized_asset().is_none());
    }

    #[test]
    fn test_set_gain_is_shared_with_graph() {
        let gain = GainControl::default();
        let pipeline = CapturePipeline::new(Box::new(ScriptedRecorder::new()), gain.clone(), "video/webm");
        pipeline.set_gain(0.25).unwrap();
        assert_eq!(gain.get(), 0.25);
        assert!(pipeline.set_gain(f32::NAN).is_err());
        assert_eq!(pipeline.gain(), 0.25);
    }
}
