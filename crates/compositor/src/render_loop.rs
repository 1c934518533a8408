//! The continuously running render task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camlayer_common::clock::{frame_interval, RecordingClock};
use camlayer_common::error::{CamlayerError, CamlayerResult};
use camlayer_layout_model::LayoutHandle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::compositor::Compositor;
use crate::frame::VideoFrame;
use crate::surface::{Surface, SurfaceStream};

/// A tokio task that renders and presents one frame per tick.
///
/// Each tick reads the newest camera frame and a fresh layout snapshot,
/// so layout changes made between ticks show up on the next tick.
/// Ticks that fall behind are skipped rather than bunched up.
#[derive(Debug)]
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    stream: SurfaceStream,
    task: JoinHandle<u64>,
}

impl RenderLoop {
    /// Take ownership of `surface` and start rendering at `fps`.
    pub fn spawn(
        mut surface: Surface,
        mut video: watch::Receiver<Option<VideoFrame>>,
        layout: LayoutHandle,
        fps: u32,
        clock: RecordingClock,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let stream = surface.capture_stream();
        let flag = Arc::clone(&running);

        let task = tokio::spawn(async move {
            let mut compositor = Compositor::new();
            let mut ticker = tokio::time::interval(frame_interval(fps));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                width = surface.width(),
                height = surface.height(),
                fps,
                "Render loop started"
            );

            while flag.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !flag.load(Ordering::SeqCst) {
                    break;
                }

                let frame = video.borrow_and_update().clone();
                let snapshot = layout.snapshot();
                compositor.render_frame(&mut surface, frame.as_ref(), &snapshot);
                let sequence = surface.present(clock.elapsed_ns());

                if sequence % 300 == 0 {
                    tracing::debug!(sequence, overlays = snapshot.len(), "Frames rendered");
                }
            }

            let rendered = surface.presented();
            tracing::info!(frames = rendered, "Render loop stopped");
            rendered
        });

        Self {
            running,
            stream,
            task,
        }
    }

    /// Stream of presented frames.
    pub fn capture_stream(&self) -> SurfaceStream {
        self.stream.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.task.is_finished()
    }

    /// Ask the loop to exit after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop the loop and wait for it. Returns the number of frames rendered.
    pub async fn join(self) -> CamlayerResult<u64> {
        self.stop();
        self.task
            .await
            .map_err(|e| CamlayerError::render(format!("Render loop task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camlayer_common::config::LayoutConfig;
    use camlayer_layout_model::OverlayImage;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn test_captured_stream_matches_rendered_surface() {
        let camera = VideoFrame::new(RgbaImage::from_pixel(160, 90, Rgba([200, 10, 10, 255])), 0);
        let (_video_tx, video_rx) = watch::channel(Some(camera.clone()));
        let layout = LayoutHandle::new();
        let overlay = OverlayImage::new(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 255, 255]))).unwrap();
        layout.add(overlay, 160.0, 90.0, &LayoutConfig::default());

        let render = RenderLoop::spawn(
            Surface::new(160, 90),
            video_rx,
            layout.clone(),
            120,
            RecordingClock::start(),
        );
        let mut stream = render.capture_stream();
        let captured = stream.next_frame().await.expect("a presented frame");

        let mut expected = Surface::new(160, 90);
        Compositor::new().render_frame(&mut expected, Some(&camera), &layout.snapshot());

        assert_eq!(captured.image.as_raw(), expected.canvas().as_raw());
        assert_ne!(captured.image.as_raw(), camera.image.as_raw());

        let frames = render.join().await.unwrap();
        assert!(frames >= 1);
    }

    #[tokio::test]
    async fn test_loop_renders_without_camera_and_stops() {
        let (_video_tx, video_rx) = watch::channel(None);
        let render = RenderLoop::spawn(
            Surface::new(8, 8),
            video_rx,
            LayoutHandle::new(),
            200,
            RecordingClock::start(),
        );
        let mut stream = render.capture_stream();
        let first = stream.next_frame().await.unwrap();
        let second = stream.next_frame().await.unwrap();
        assert!(second.sequence > first.sequence);
        assert!(render.is_running());

        render.stop();
        let frames = render.join().await.unwrap();
        assert!(frames >= 2);
    }
}
