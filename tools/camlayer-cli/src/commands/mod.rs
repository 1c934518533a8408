pub mod check;
pub mod compose;
pub mod layout;
pub mod record;

use std::path::Path;

use anyhow::Context;
use camlayer_common::config::AppConfig;
use camlayer_common::error::CamlayerError;
use camlayer_layout_model::OverlayImage;
use camlayer_session::RasterDecoder;

/// Read and decode one image file.
pub fn load_image(path: &Path) -> anyhow::Result<OverlayImage> {
    if !path.exists() {
        return Err(CamlayerError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    RasterDecoder::decode_now(&bytes).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Surface size from the command line, falling back to the configuration.
pub fn surface_size(config: &AppConfig, width: Option<u32>, height: Option<u32>) -> anyhow::Result<(u32, u32)> {
    let width = width.unwrap_or(config.surface.width);
    let height = height.unwrap_or(config.surface.height);
    if width == 0 || height == 0 {
        anyhow::bail!("Surface must have a non-zero size, got {width}x{height}");
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image_reports_missing_file() {
        let path = std::env::temp_dir().join("camlayer-no-such-image.png");
        let err = load_image(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CamlayerError>(),
            Some(CamlayerError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_surface_size_falls_back_to_config() {
        let config = AppConfig::default();
        assert_eq!(surface_size(&config, Some(320), None).unwrap(), (320, 450));
        assert!(surface_size(&config, Some(0), None).is_err());
    }
}
