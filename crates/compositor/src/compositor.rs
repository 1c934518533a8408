//! Frame compositor: combines the live video and placed overlays.
//!
//! Each call to [`Compositor::render_frame`] produces one complete
//! picture from scratch:
//!
//! 1. clear the whole surface,
//! 2. draw the live video frame scaled to fill `(0, 0)-(w, h)`,
//! 3. draw every overlay at its stored rectangle in store order.
//!
//! Overlays are alpha-blended and clipped to the surface bounds, so
//! overlays dragged partially or fully off-surface are simply cut off.

use std::collections::HashMap;
use std::sync::Arc;

use camlayer_layout_model::{LayoutSnapshot, OverlayId};
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::frame::VideoFrame;
use crate::surface::Surface;

/// Statistics for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Whether a video frame was drawn.
    pub video_drawn: bool,
    /// Overlays drawn (including fully clipped ones).
    pub overlays_drawn: usize,
    /// Overlay rasters that had to be rescaled for this frame.
    pub cache_misses: usize,
}

type ScaleKey = (OverlayId, u32, u32);

/// Renders frames onto a [`Surface`].
///
/// Holds a cache of overlay rasters already scaled to their display size.
/// The cache only ever contains the overlays drawn in the latest frame.
#[derive(Debug, Default)]
pub struct Compositor {
    scaled: HashMap<ScaleKey, Arc<RgbaImage>>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached scaled overlays.
    pub fn cached_overlays(&self) -> usize {
        self.scaled.len()
    }

    /// Draw one complete frame. The surface is not presented.
    pub fn render_frame(
        &mut self,
        surface: &mut Surface,
        video: Option<&VideoFrame>,
        layout: &LayoutSnapshot,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        surface.clear();

        if let Some(frame) = video {
            draw_video(surface.canvas_mut(), &frame.image);
            stats.video_drawn = true;
        }

        let mut used: HashMap<ScaleKey, Arc<RgbaImage>> = HashMap::with_capacity(layout.len());
        for entry in layout {
            let (width, height) = entry.rect.pixel_size();
            let key = (entry.image.id(), width, height);

            let raster = match used.get(&key).or_else(|| self.scaled.get(&key)) {
                Some(raster) => Arc::clone(raster),
                None => {
                    stats.cache_misses += 1;
                    scale_overlay(entry.image.raster(), width, height)
                }
            };

            imageops::overlay(
                surface.canvas_mut(),
                &*raster,
                entry.rect.x.round() as i64,
                entry.rect.y.round() as i64,
            );
            used.insert(key, raster);
            stats.overlays_drawn += 1;
        }
        self.scaled = used;

        stats
    }
}

fn draw_video(canvas: &mut RgbaImage, video: &RgbaImage) {
    if video.dimensions() == canvas.dimensions() {
        imageops::replace(canvas, video, 0, 0);
    } else {
        let scaled = imageops::resize(video, canvas.width(), canvas.height(), FilterType::Triangle);
        imageops::replace(canvas, &scaled, 0, 0);
    }
}

fn scale_overlay(raster: &RgbaImage, width: u32, height: u32) -> Arc<RgbaImage> {
    if raster.dimensions() == (width, height) {
        Arc::new(raster.clone())
    } else {
        Arc::new(imageops::resize(raster, width, height, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camlayer_common::config::LayoutConfig;
    use camlayer_layout_model::{LayoutHandle, OverlayImage, Point};
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn solid(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, color)
    }

    fn layout(overlays: &[RgbaImage]) -> LayoutHandle {
        let handle = LayoutHandle::new();
        for raster in overlays {
            let image = OverlayImage::new(raster.clone()).unwrap();
            handle.add(image, 800.0, 450.0, &LayoutConfig::default());
        }
        handle
    }

    #[test]
    fn test_video_fills_surface_and_overlay_sits_on_top() {
        let mut surface = Surface::new(800, 450);
        let mut compositor = Compositor::new();
        let video = VideoFrame::new(solid(800, 450, RED), 0);
        // 100x200 is placed unscaled at (15, 125).
        let handle = layout(&[solid(100, 200, BLUE)]);

        let stats = compositor.render_frame(&mut surface, Some(&video), &handle.snapshot());

        assert!(stats.video_drawn);
        assert_eq!(stats.overlays_drawn, 1);
        assert_eq!(*surface.canvas().get_pixel(0, 0), RED);
        assert_eq!(*surface.canvas().get_pixel(15, 125), BLUE);
        assert_eq!(*surface.canvas().get_pixel(114, 324), BLUE);
        assert_eq!(*surface.canvas().get_pixel(115, 324), RED);
        assert_eq!(*surface.canvas().get_pixel(14, 125), RED);
    }

    #[test]
    fn test_later_overlay_wins_where_overlapping() {
        let mut surface = Surface::new(800, 450);
        let mut compositor = Compositor::new();
        let handle = layout(&[solid(100, 100, BLUE), solid(100, 100, GREEN)]);
        handle.move_to(0, Point::new(50.0, 50.0));
        handle.move_to(1, Point::new(100.0, 100.0));

        compositor.render_frame(&mut surface, None, &handle.snapshot());

        assert_eq!(*surface.canvas().get_pixel(60, 60), BLUE);
        assert_eq!(*surface.canvas().get_pixel(120, 120), GREEN);
        assert_eq!(*surface.canvas().get_pixel(199, 199), GREEN);
    }

    #[test]
    fn test_absent_video_and_empty_store_leave_a_cleared_surface() {
        let mut surface = Surface::new(64, 36);
        let mut compositor = Compositor::new();
        compositor.render_frame(
            &mut surface,
            Some(&VideoFrame::new(solid(64, 36, RED), 0)),
            &LayoutSnapshot::default(),
        );

        let stats = compositor.render_frame(&mut surface, None, &LayoutSnapshot::default());

        assert_eq!(stats, RenderStats::default());
        assert!(surface.canvas().pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_video_of_other_size_is_scaled_to_fill() {
        let mut surface = Surface::new(80, 45);
        let mut compositor = Compositor::new();
        let video = VideoFrame::new(solid(16, 9, RED), 0);

        compositor.render_frame(&mut surface, Some(&video), &LayoutSnapshot::default());

        for (x, y) in [(0, 0), (40, 22), (79, 44)] {
            let pixel = surface.canvas().get_pixel(x, y);
            assert!(pixel[0] >= 250 && pixel[1] == 0 && pixel[2] == 0, "{pixel:?}");
        }
    }

    #[test]
    fn test_off_surface_overlay_is_clipped() {
        let mut surface = Surface::new(800, 450);
        let mut compositor = Compositor::new();
        let handle = layout(&[solid(100, 100, BLUE)]);
        handle.move_to(0, Point::new(-50.0, 400.0));

        compositor.render_frame(&mut surface, None, &handle.snapshot());

        assert_eq!(*surface.canvas().get_pixel(0, 449), BLUE);
        assert_eq!(*surface.canvas().get_pixel(49, 400), BLUE);
        assert_eq!(*surface.canvas().get_pixel(50, 400), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_scaled_overlays_are_cached_and_pruned() {
        let mut surface = Surface::new(800, 450);
        let mut compositor = Compositor::new();
        let handle = layout(&[solid(400, 300, BLUE)]);

        let first = compositor.render_frame(&mut surface, None, &handle.snapshot());
        let second = compositor.render_frame(&mut surface, None, &handle.snapshot());
        assert_eq!(first.cache_misses, 1);
        assert_eq!(second.cache_misses, 0);
        assert_eq!(compositor.cached_overlays(), 1);

        handle.clear();
        compositor.render_frame(&mut surface, None, &handle.snapshot());
        assert_eq!(compositor.cached_overlays(), 0);
    }
}
