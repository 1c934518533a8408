//! Turning uploaded bytes into overlay rasters.

use camlayer_common::error::{CamlayerError, CamlayerResult};
use camlayer_layout_model::OverlayImage;

/// Decodes an encoded image file into an [`OverlayImage`].
#[async_trait::async_trait]
pub trait ImageDecoder: Send + Sync {
    async fn decode(&self, bytes: Vec<u8>) -> CamlayerResult<OverlayImage>;
}

/// Decodes PNG, JPEG, GIF, WebP and BMP with the `image` crate on a
/// blocking thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    /// Decode on the current thread.
    pub fn decode_now(bytes: &[u8]) -> CamlayerResult<OverlayImage> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| CamlayerError::decode(format!("Unreadable image: {e}")))?;
        OverlayImage::from_dynamic(image)
    }
}

#[async_trait::async_trait]
impl ImageDecoder for RasterDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> CamlayerResult<OverlayImage> {
        tokio::task::spawn_blocking(move || Self::decode_now(&bytes))
            .await
            .map_err(|e| CamlayerError::decode(format!("Decode task failed: {e}")))?
    }
}
