//! The drawing surface and its capture stream.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tokio::sync::watch;

use crate::frame::ComposedFrame;

/// A fixed-size RGBA canvas.
///
/// Drawing happens on the private canvas; nothing becomes visible to
/// capture until [`Surface::present`] publishes a copy.
#[derive(Debug)]
pub struct Surface {
    canvas: RgbaImage,
    sequence: u64,
    tx: watch::Sender<Option<ComposedFrame>>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            canvas: RgbaImage::new(width, height),
            sequence: 0,
            tx,
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut RgbaImage {
        &mut self.canvas
    }

    /// Fill every pixel with transparent black.
    pub fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Publish the current canvas as the newest capture frame.
    pub fn present(&mut self, timestamp_ns: u64) -> u64 {
        self.sequence += 1;
        let frame = ComposedFrame {
            image: Arc::new(self.canvas.clone()),
            sequence: self.sequence,
            timestamp_ns,
        };
        self.tx.send_replace(Some(frame));
        self.sequence
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.sequence
    }

    /// A live stream of presented frames.
    pub fn capture_stream(&self) -> SurfaceStream {
        SurfaceStream {
            rx: self.tx.subscribe(),
            width: self.width(),
            height: self.height(),
        }
    }
}

/// Receiving end of a surface's presented frames.
///
/// Only the newest frame is retained; a slow consumer skips frames rather
/// than queueing them.
#[derive(Debug, Clone)]
pub struct SurfaceStream {
    rx: watch::Receiver<Option<ComposedFrame>>,
    width: u32,
    height: u32,
}

impl SurfaceStream {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Newest presented frame without waiting.
    pub fn latest(&self) -> Option<ComposedFrame> {
        self.rx.borrow().clone()
    }

    /// Wait for the next presentation. Returns `None` once the surface is gone.
    pub async fn next_frame(&mut self) -> Option<ComposedFrame> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }
}
