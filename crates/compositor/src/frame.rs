//! Frame types flowing into and out of the compositor.

use std::sync::Arc;

use image::RgbaImage;

/// One decoded camera frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: Arc<RgbaImage>,
    /// Nanoseconds since the session clock epoch.
    pub timestamp_ns: u64,
}

impl VideoFrame {
    pub fn new(image: RgbaImage, timestamp_ns: u64) -> Self {
        Self {
            image: Arc::new(image),
            timestamp_ns,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// The pixels of one presented surface.
#[derive(Debug, Clone)]
pub struct ComposedFrame {
    pub image: Arc<RgbaImage>,
    /// Monotonic presentation counter, starting at 1.
    pub sequence: u64,
    pub timestamp_ns: u64,
}

impl ComposedFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
