//! Decoded overlay rasters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use camlayer_common::error::{CamlayerError, CamlayerResult};
use image::{DynamicImage, RgbaImage};

static NEXT_OVERLAY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a decoded overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

impl OverlayId {
    fn next() -> Self {
        Self(NEXT_OVERLAY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// An immutable decoded raster. Clones share the pixel buffer.
#[derive(Clone)]
pub struct OverlayImage {
    id: OverlayId,
    raster: Arc<RgbaImage>,
}

impl OverlayImage {
    /// Wrap a decoded RGBA raster. Rasters without area are rejected.
    pub fn new(raster: RgbaImage) -> CamlayerResult<Self> {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Err(CamlayerError::decode(format!(
                "Overlay raster has no area ({width}x{height})"
            )));
        }
        Ok(Self {
            id: OverlayId::next(),
            raster: Arc::new(raster),
        })
    }

    /// Convert any decoded image to RGBA and wrap it.
    pub fn from_dynamic(image: DynamicImage) -> CamlayerResult<Self> {
        Self::new(image.into_rgba8())
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    /// Natural width in pixels.
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Natural height in pixels.
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }
}

impl fmt::Debug for OverlayImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayImage")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_raster() {
        let err = OverlayImage::new(RgbaImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, CamlayerError::Decode { .. }));
    }

    #[test]
    fn test_ids_are_unique_and_clones_share_identity() {
        let a = OverlayImage::new(RgbaImage::new(4, 3)).unwrap();
        let b = OverlayImage::new(RgbaImage::new(4, 3)).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
        assert!((a.aspect_ratio() - 4.0 / 3.0).abs() < 1e-12);
    }
}
