//! A device-free media source: color bars and a sine tone.
//!
//! Used for headless runs and tests. Frames show eight vertical color
//! bars with a white line sweeping down one row per frame, so
//! consecutive frames always differ.

use std::f32::consts::TAU;
use std::time::Duration;

use camlayer_common::clock::{frame_interval, RecordingClock};
use camlayer_common::error::{CamlayerError, CamlayerResult};
use camlayer_compositor::VideoFrame;
use image::{Rgba, RgbaImage};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::MissedTickBehavior;

use super::{LiveStream, MediaSource, StreamMetadata};
use crate::audio::{AudioChunk, AUDIO_CHANNEL_CAPACITY};

const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Length of one audio chunk.
const AUDIO_CHUNK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub tone_hz: f32,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            sample_rate: 48_000,
            channels: 1,
            tone_hz: 440.0,
        }
    }

    pub fn with_audio(mut self, sample_rate: u32, channels: u16) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }

    fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            width: self.width,
            height: self.height,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

#[async_trait::async_trait]
impl MediaSource for SyntheticSource {
    async fn acquire(&mut self) -> CamlayerResult<LiveStream> {
        if self.width == 0 || self.height == 0 {
            return Err(CamlayerError::acquisition(format!(
                "Synthetic camera cannot produce {}x{} frames",
                self.width, self.height
            )));
        }

        let (video_tx, video_rx) = watch::channel(None);
        let (audio_tx, _audio_rx) = broadcast::channel(AUDIO_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();

        let source = self.clone();
        let audio = audio_tx.clone();
        tokio::spawn(async move { source.run(video_tx, audio, ready_tx).await });

        tracing::info!(
            width = self.width,
            height = self.height,
            fps = self.fps,
            "Synthetic media source acquired"
        );
        Ok(LiveStream::new(video_rx, audio_tx, ready_rx))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

impl SyntheticSource {
    async fn run(
        self,
        video: watch::Sender<Option<VideoFrame>>,
        audio: broadcast::Sender<AudioChunk>,
        ready: oneshot::Sender<StreamMetadata>,
    ) {
        let clock = RecordingClock::start();
        let mut ready = Some(ready);
        let mut frame_index = 0u64;
        let mut sample_index = 0u64;

        let mut video_tick = tokio::time::interval(frame_interval(self.fps));
        video_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut audio_tick = tokio::time::interval(AUDIO_CHUNK);
        audio_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = video.closed() => break,
                _ = video_tick.tick() => {
                    let image = test_pattern(self.width, self.height, frame_index);
                    video.send_replace(Some(VideoFrame::new(image, clock.elapsed_ns())));
                    frame_index += 1;
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(self.metadata());
                    }
                }
                _ = audio_tick.tick() => {
                    let chunk = self.tone(&mut sample_index, clock.elapsed_ns());
                    // Nobody listening between recordings.
                    let _ = audio.send(chunk);
                }
            }
        }
        tracing::debug!(frames = frame_index, "Synthetic media source stopped");
    }

    fn tone(&self, sample_index: &mut u64, timestamp_ns: u64) -> AudioChunk {
        let frames = (self.sample_rate as u64 * AUDIO_CHUNK.as_millis() as u64 / 1000) as usize;
        let channels = self.channels.max(1) as usize;
        let mut samples = Vec::with_capacity(frames * channels);
        for _ in 0..frames {
            let t = *sample_index as f32 / self.sample_rate.max(1) as f32;
            let value = 0.2 * (TAU * self.tone_hz * t).sin();
            samples.extend(std::iter::repeat(value).take(channels));
            *sample_index += 1;
        }
        AudioChunk {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ns,
        }
    }
}

/// Color bars with a white line at row `frame_index % height`.
pub fn test_pattern(width: u32, height: u32, frame_index: u64) -> RgbaImage {
    let line = (frame_index % height.max(1) as u64) as u32;
    RgbaImage::from_fn(width, height, |x, y| {
        if y == line {
            return Rgba([255, 255, 255, 255]);
        }
        let bar = (x as usize * BARS.len()) / width.max(1) as usize;
        let [r, g, b] = BARS[bar.min(BARS.len() - 1)];
        Rgba([r, g, b, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_moves_between_frames() {
        let a = test_pattern(32, 8, 0);
        let b = test_pattern(32, 8, 1);
        assert_ne!(a.as_raw(), b.as_raw());
        assert_eq!(*a.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*a.get_pixel(31, 1), Rgba([16, 16, 16, 255]));
    }

    #[tokio::test]
    async fn test_acquire_reports_metadata_and_frames() {
        let mut source = SyntheticSource::new(64, 36, 60).with_audio(8_000, 2);
        let mut stream = source.acquire().await.unwrap();
        let mut audio = stream.audio.subscribe();

        let metadata = stream.metadata().await.unwrap();
        assert_eq!(
            metadata,
            StreamMetadata {
                width: 64,
                height: 36,
                sample_rate: 8_000,
                channels: 2
            }
        );

        stream.video.changed().await.unwrap();
        let frame = stream.video.borrow().clone().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 36));

        let chunk = audio.recv().await.unwrap();
        assert_eq!(chunk.channels, 2);
        assert_eq!(chunk.frames(), 160);

        assert!(stream.metadata().await.is_err());
    }

    #[tokio::test]
    async fn test_zero_sized_camera_fails_acquisition() {
        let mut source = SyntheticSource::new(0, 36, 30);
        let err = source.acquire().await.unwrap_err();
        assert!(err.is_fatal_to_session());
    }
}
